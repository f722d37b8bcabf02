use treepath::{EvalError, Value, compile};

fn map(pairs: Vec<(&str, Value)>) -> Value {
    Value::Map(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

fn seq(values: Vec<Value>) -> Value {
    Value::Sequence(values)
}

fn s(text: &str) -> Value {
    Value::String(text.to_string())
}

fn eval(template: &str, doc: &Value) -> Result<Vec<Vec<Value>>, EvalError> {
    compile("test", template).unwrap().evaluate(doc)
}

#[test]
fn range_expands_one_group_per_candidate() {
    let doc = map(vec![(
        "items",
        seq(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
    )]);
    let groups = eval("{range .items[*]}{@}{end}", &doc).unwrap();
    assert_eq!(
        groups,
        vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(3)]]
    );
}

#[test]
fn range_body_is_scoped_to_one_candidate() {
    let doc = map(vec![(
        "users",
        seq(vec![
            map(vec![("name", s("amy")), ("age", Value::Int(35))]),
            map(vec![("name", s("bob")), ("age", Value::Int(28))]),
        ]),
    )]);
    let groups = eval("{range .users[*]}{.name}{.age}{end}", &doc).unwrap();
    assert_eq!(
        groups,
        vec![
            vec![s("amy")],
            vec![Value::Int(35)],
            vec![s("bob")],
            vec![Value::Int(28)],
        ]
    );
}

#[test]
fn range_interleaves_body_text() {
    let doc = map(vec![("items", seq(vec![Value::Int(1), Value::Int(2)]))]);
    let groups = eval("{range .items[*]}i={@} {end}", &doc).unwrap();
    assert_eq!(
        groups,
        vec![
            vec![s("i=")],
            vec![Value::Int(1)],
            vec![s(" ")],
            vec![s("i=")],
            vec![Value::Int(2)],
            vec![s(" ")],
        ]
    );
}

#[test]
fn nodes_after_end_run_once_in_the_outer_scope() {
    let doc = map(vec![("items", seq(vec![Value::Int(1), Value::Int(2)]))]);
    let groups = eval("{range .items[*]}{@}{end}done", &doc).unwrap();
    assert_eq!(
        groups,
        vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![s("done")]]
    );
}

#[test]
fn nested_ranges_close_innermost_first() {
    let doc = map(vec![(
        "teams",
        seq(vec![
            map(vec![("members", seq(vec![s("amy"), s("bob")]))]),
            map(vec![("members", seq(vec![s("cal")]))]),
        ]),
    )]);
    let groups = eval(
        "{range .teams[*]}{range .members[*]}{@}{end}{end}",
        &doc,
    )
    .unwrap();
    assert_eq!(groups, vec![vec![s("amy")], vec![s("bob")], vec![s("cal")]]);
}

#[test]
fn range_over_an_empty_sequence_produces_no_groups() {
    let doc = map(vec![("items", seq(vec![]))]);
    let groups = eval("{range .items[*]}{@}{end}", &doc).unwrap();
    assert_eq!(groups, Vec::<Vec<Value>>::new());
}

#[test]
fn range_with_no_following_nodes_emits_nothing() {
    let doc = map(vec![("items", seq(vec![Value::Int(1), Value::Int(2)]))]);
    let groups = eval("{range .items[*]}", &doc).unwrap();
    assert_eq!(groups, Vec::<Vec<Value>>::new());
}

#[test]
fn end_without_range_is_an_error() {
    let doc = map(vec![("a", Value::Int(1))]);
    assert_eq!(eval("{end}", &doc).unwrap_err(), EvalError::UnboundEnd);
}
