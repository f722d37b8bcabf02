use treepath::{EvalError, Map, Record, RecordField, Value, compile};

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
fn simple_field_access() {
    let doc = map(vec![("name", s("John")), ("age", Value::Int(30))]);
    assert_eq!(eval("{.name}", &doc).unwrap(), vec![vec![s("John")]]);
}

#[test]
fn nested_field_access() {
    let doc = map(vec![(
        "user",
        map(vec![("name", s("Alice")), ("email", s("alice@example.com"))]),
    )]);
    assert_eq!(eval("{.user.email}", &doc).unwrap(), vec![vec![s("alice@example.com")]]);
}

#[test]
fn text_outside_groups_is_emitted_verbatim() {
    let doc = map(vec![("name", s("Ada"))]);
    let groups = eval("name={.name}", &doc).unwrap();
    assert_eq!(groups, vec![vec![s("name=")], vec![s("Ada")]]);
}

#[test]
fn evaluation_is_deterministic_and_paths_are_reusable() {
    let doc = map(vec![("items", seq(vec![Value::Int(1), Value::Int(2)]))]);
    let path = compile("test", "{.items[*]}").unwrap();
    let first = path.evaluate(&doc).unwrap();
    let second = path.evaluate(&doc).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, vec![vec![Value::Int(1), Value::Int(2)]]);
}

#[test]
fn slice_selects_half_open_range() {
    let doc = map(vec![(
        "items",
        seq(vec![Value::Int(0), Value::Int(1), Value::Int(2), Value::Int(3)]),
    )]);
    assert_eq!(
        eval("{.items[1:3]}", &doc).unwrap(),
        vec![vec![Value::Int(1), Value::Int(2)]]
    );
}

#[test]
fn empty_slice_is_exempt_from_bounds_checks() {
    let doc = map(vec![("items", seq(vec![Value::Int(1), Value::Int(2)]))]);
    // start == end never errors, whatever the index
    assert_eq!(eval("{.items[5:5]}", &doc).unwrap(), vec![vec![]]);
    assert_eq!(eval("{.items[0:0]}", &doc).unwrap(), vec![vec![]]);
}

#[test]
fn negative_indices_count_from_the_end() {
    let doc = map(vec![(
        "items",
        seq(vec![Value::Int(10), Value::Int(20), Value::Int(30)]),
    )]);
    assert_eq!(
        eval("{.items[-2:]}", &doc).unwrap(),
        vec![vec![Value::Int(20), Value::Int(30)]]
    );
    assert_eq!(eval("{.items[-1]}", &doc).unwrap(), vec![vec![Value::Int(30)]]);
}

#[test]
fn stepped_slice_skips_elements() {
    let doc = map(vec![(
        "items",
        seq(vec![
            Value::Int(0),
            Value::Int(1),
            Value::Int(2),
            Value::Int(3),
            Value::Int(4),
        ]),
    )]);
    assert_eq!(
        eval("{.items[0:5:2]}", &doc).unwrap(),
        vec![vec![Value::Int(0), Value::Int(2), Value::Int(4)]]
    );
    assert_eq!(
        eval("{.items[::-1]}", &doc).unwrap_err(),
        EvalError::InvalidStep(-1)
    );
}

#[test]
fn slice_out_of_bounds_is_an_error() {
    let doc = map(vec![("items", seq(vec![Value::Int(1), Value::Int(2)]))]);
    assert_eq!(
        eval("{.items[0:10]}", &doc).unwrap_err(),
        EvalError::IndexOutOfBounds {
            index: 9,
            length: 2,
        }
    );
    assert_eq!(
        eval("{.items[4:6]}", &doc).unwrap_err(),
        EvalError::IndexOutOfBounds {
            index: 4,
            length: 2,
        }
    );
}

#[test]
fn slicing_a_non_sequence_is_a_type_error() {
    let doc = map(vec![("items", map(vec![("a", Value::Int(1))]))]);
    assert!(matches!(
        eval("{.items[0:1]}", &doc).unwrap_err(),
        EvalError::TypeMismatch(_)
    ));
}

#[test]
fn record_fields_resolve_alias_then_inline_then_name() {
    let embedded = Record::new(vec![RecordField::aliased("c_field", "c", Value::Int(3))]);
    let doc = Value::Record(Record::new(vec![
        RecordField::aliased("a_field", "a", Value::Int(1)),
        RecordField::aliased("b_field", "b", Value::Int(2)),
        RecordField::inline("embedded", Value::Record(embedded)),
    ]));

    assert_eq!(eval("{.a}", &doc).unwrap(), vec![vec![Value::Int(1)]]);
    // promoted out of the inline embedded record
    assert_eq!(eval("{.c}", &doc).unwrap(), vec![vec![Value::Int(3)]]);
    // declared-name fallback
    assert_eq!(eval("{.b_field}", &doc).unwrap(), vec![vec![Value::Int(2)]]);
}

#[test]
fn alias_matches_take_priority_over_declared_names() {
    let doc = Value::Record(Record::new(vec![
        RecordField::aliased("first", "b", Value::Int(1)),
        RecordField::named("b", Value::Int(2)),
    ]));
    assert_eq!(eval("{.b}", &doc).unwrap(), vec![vec![Value::Int(1)]]);
}

#[test]
fn missing_field_errors_unless_tolerated() {
    let doc = map(vec![("a", Value::Int(1))]);
    assert_eq!(
        eval("{.missing}", &doc).unwrap_err(),
        EvalError::FieldNotFound("missing".to_string())
    );

    let groups = compile("test", "{.missing}")
        .unwrap()
        .allow_missing_keys(true)
        .evaluate(&doc)
        .unwrap();
    assert_eq!(groups, vec![vec![]]);
}

#[test]
fn int_keyed_maps_convert_the_field_name() {
    let doc = Value::Map(Map::from_iter([(7i64, s("seven"))]));
    assert_eq!(eval("{.7}", &doc).unwrap(), vec![vec![s("seven")]]);
    assert_eq!(
        eval("{.seven}", &doc).unwrap_err(),
        EvalError::KeyConversion {
            name: "seven".to_string(),
            kind: "int",
        }
    );
}

#[test]
fn null_references_contribute_no_match() {
    let doc = Value::Reference(Some(Box::new(map(vec![("a", Value::Int(1))]))));
    assert_eq!(eval("{.a}", &doc).unwrap(), vec![vec![Value::Int(1)]]);

    let doc = map(vec![(
        "items",
        seq(vec![
            Value::Reference(Some(Box::new(map(vec![("a", Value::Int(1))])))),
            Value::Reference(None),
        ]),
    )]);
    // the dangling reference is skipped, not an error
    assert_eq!(eval("{.items[*].a}", &doc).unwrap(), vec![vec![Value::Int(1)]]);
}

#[test]
fn wildcard_enumerates_children_in_order() {
    let doc = map(vec![
        ("b", Value::Int(2)),
        ("a", Value::Int(1)),
        ("c", Value::Int(3)),
    ]);
    // insertion order, not key order
    assert_eq!(
        eval("{.*}", &doc).unwrap(),
        vec![vec![Value::Int(2), Value::Int(1), Value::Int(3)]]
    );
}

#[test]
fn wildcard_over_scalars_yields_nothing() {
    let doc = map(vec![("n", Value::Int(5))]);
    assert_eq!(eval("{.n[*]}", &doc).unwrap(), vec![vec![]]);
}

#[test]
fn recursive_descent_is_preorder() {
    let inner = map(vec![("b", Value::Int(1))]);
    let doc = map(vec![("a", inner.clone())]);

    // the descent itself emits containers: the root, then the inner map
    assert_eq!(
        eval("{..}", &doc).unwrap(),
        vec![vec![doc.clone(), inner.clone()]]
    );
    // descend-then-enumerate reaches the inner map before its leaf, with
    // neither omitted nor duplicated
    assert_eq!(
        eval("{..*}", &doc).unwrap(),
        vec![vec![inner.clone(), Value::Int(1)]]
    );
    assert_eq!(eval("{..b}", &doc).unwrap(), vec![vec![Value::Int(1)]]);
}

#[test]
fn union_is_candidate_major() {
    let doc = map(vec![("a", Value::Int(1)), ("b", Value::Int(2))]);
    assert_eq!(
        eval("{[a,b]}", &doc).unwrap(),
        vec![vec![Value::Int(1), Value::Int(2)]]
    );

    let doc = map(vec![(
        "pairs",
        seq(vec![
            map(vec![("a", Value::Int(1)), ("b", Value::Int(2))]),
            map(vec![("a", Value::Int(3)), ("b", Value::Int(4))]),
        ]),
    )]);
    // candidate 1's full [a,b] precedes candidate 2's
    assert_eq!(
        eval("{.pairs[*][a,b]}", &doc).unwrap(),
        vec![vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]]
    );
}

#[test]
fn filter_keeps_matching_elements_in_order() {
    let doc = map(vec![(
        "people",
        seq(vec![
            map(vec![("name", s("amy")), ("age", Value::Int(35))]),
            map(vec![("name", s("bob")), ("age", Value::Int(28))]),
            map(vec![("name", s("cal")), ("age", Value::Int(41))]),
        ]),
    )]);
    let groups = eval("{.people[?(@.age > 30)].name}", &doc).unwrap();
    assert_eq!(groups, vec![vec![s("amy"), s("cal")]]);
}

#[test]
fn filter_compares_strings_and_mixed_numbers() {
    let doc = map(vec![(
        "items",
        seq(vec![
            map(vec![("name", s("bob")), ("score", Value::Float(1.5))]),
            map(vec![("name", s("amy")), ("score", Value::Int(2))]),
        ]),
    )]);
    let groups = eval("{.items[?(@.name == 'bob')].score}", &doc).unwrap();
    assert_eq!(groups, vec![vec![Value::Float(1.5)]]);

    let groups = eval("{.items[?(@.score >= 1.5)].name}", &doc).unwrap();
    assert_eq!(groups, vec![vec![s("bob"), s("amy")]]);
}

#[test]
fn exists_filter_yields_empty_when_nothing_resolves() {
    let doc = map(vec![(
        "items",
        seq(vec![map(vec![("a", Value::Int(1))]), map(vec![("b", Value::Int(2))])]),
    )]);
    assert_eq!(eval("{.items[?(@.missing)]}", &doc).unwrap(), vec![vec![]]);

    let groups = eval("{.items[?(@.a)]}", &doc).unwrap();
    assert_eq!(groups, vec![vec![map(vec![("a", Value::Int(1))])]]);
}

#[test]
fn filter_operands_must_resolve_to_one_value() {
    let doc = map(vec![(
        "items",
        seq(vec![map(vec![(
            "xs",
            seq(vec![Value::Int(1), Value::Int(2)]),
        )])]),
    )]);
    assert_eq!(
        eval("{.items[?(@.xs[*] > 0)]}", &doc).unwrap_err(),
        EvalError::Cardinality(2)
    );
}

#[test]
fn filter_on_a_non_sequence_is_a_type_error() {
    let doc = map(vec![("item", Value::Int(3))]);
    assert!(matches!(
        eval("{.item[?(@ > 1)]}", &doc).unwrap_err(),
        EvalError::TypeMismatch(_)
    ));
}

#[test]
fn incomparable_filter_operands_abort() {
    let doc = map(vec![(
        "items",
        seq(vec![map(vec![("v", s("ten"))])]),
    )]);
    assert!(matches!(
        eval("{.items[?(@.v > 5)]}", &doc).unwrap_err(),
        EvalError::Incomparable(_)
    ));
}

#[test]
fn unrecognized_identifier_is_an_error() {
    let doc = map(vec![("a", Value::Int(1))]);
    assert_eq!(
        eval("{loop}", &doc).unwrap_err(),
        EvalError::UnrecognizedIdentifier("loop".to_string())
    );
}
