//! The tree-walking evaluator.
//!
//! A compiled [`Path`] is walked against a root value, threading candidate
//! sets through each step of every `{...}` group and producing one result
//! group per top-level node. `range`/`end` groups expand into one
//! re-evaluation of the remaining nodes per loop candidate, driven by the
//! per-call [`EvalContext`] state machine.

use crate::{
    ast::{Node, SliceParam},
    compare,
    parser::{self, ParseError},
    value::{Key, KeyKind, Record, Value},
};

/// Errors that can occur during path evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A field matched nothing across all candidates (suppressible with
    /// [`Path::allow_missing_keys`])
    FieldNotFound(String),

    /// The candidate is the wrong kind of container for the operation
    TypeMismatch(String),

    /// A field name does not convert to the map's key kind
    KeyConversion { name: String, kind: &'static str },

    /// A slice bound falls outside the sequence
    IndexOutOfBounds { index: i64, length: usize },

    /// A slice step of zero or less
    InvalidStep(i64),

    /// A filter operand resolved to more than one value
    Cardinality(usize),

    /// `end` with no open `range`
    UnboundEnd,

    /// A bareword other than `range`/`end`
    UnrecognizedIdentifier(String),

    /// A filter operator outside the supported set
    UnrecognizedOperator(String),

    /// The comparison rules rejected the operand types
    Incomparable(compare::CompareError),
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::FieldNotFound(name) => write!(f, "{} is not found", name),
            EvalError::TypeMismatch(msg) => write!(f, "type mismatch: {}", msg),
            EvalError::KeyConversion { name, kind } => {
                write!(f, "'{}' is not convertible to a {} map key", name, kind)
            }
            EvalError::IndexOutOfBounds { index, length } => {
                write!(f, "array index out of bounds: index {}, length {}", index, length)
            }
            EvalError::InvalidStep(step) => write!(f, "slice step must be positive, got {}", step),
            EvalError::Cardinality(count) => {
                write!(f, "can only compare one element at a time, got {}", count)
            }
            EvalError::UnboundEnd => write!(f, "not in range, nothing to end"),
            EvalError::UnrecognizedIdentifier(name) => {
                write!(f, "unrecognized identifier '{}'", name)
            }
            EvalError::UnrecognizedOperator(op) => {
                write!(f, "unrecognized filter operator '{}'", op)
            }
            EvalError::Incomparable(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvalError::Incomparable(e) => Some(e),
            _ => None,
        }
    }
}

impl From<compare::CompareError> for EvalError {
    fn from(e: compare::CompareError) -> Self {
        EvalError::Incomparable(e)
    }
}

/// Compiles a path template into a reusable [`Path`].
///
/// # Examples
///
/// ```
/// use treepath::{compile, Map, Value};
///
/// let path = compile("demo", "{.user.name}").unwrap();
/// let doc = Value::Map(Map::from_iter([(
///     "user".to_string(),
///     Value::Map(Map::from_iter([(
///         "name".to_string(),
///         Value::String("ada".to_string()),
///     )])),
/// )]));
///
/// let groups = path.evaluate(&doc).unwrap();
/// assert_eq!(groups, vec![vec![Value::String("ada".to_string())]]);
/// ```
pub fn compile(name: &str, text: &str) -> Result<Path, ParseError> {
    Ok(Path {
        name: name.to_string(),
        source: text.to_string(),
        nodes: parser::parse(name, text)?,
        allow_missing_keys: false,
    })
}

/// A compiled path template.
///
/// Immutable once compiled; safe to evaluate any number of times (each call
/// gets a fresh evaluation context).
#[derive(Debug, Clone)]
pub struct Path {
    name: String,
    source: String,
    nodes: Vec<Node>,
    allow_missing_keys: bool,
}

/// Per-call loop-controller state.
///
/// The scope stack holds the candidate sets saved by each open `range`; the
/// counters disambiguate which `end` closes which loop while the node
/// sequence is walked in a single left-to-right pass:
///
/// - `pending_opens`: ranges announced by the current step that have not
///   started looping yet
/// - `active_depth`: ranges currently looping around this point
/// - `pending_closes`: ends consumed on behalf of inner, still-open loops
struct EvalContext {
    current: Vec<Value>,
    scopes: Vec<Vec<Value>>,
    pending_opens: usize,
    active_depth: usize,
    pending_closes: usize,
    // set when the step just processed was an `end` that closed this loop
    // level; such a step contributes no result group
    scope_restored: bool,
}

impl EvalContext {
    fn new() -> Self {
        EvalContext {
            current: Vec::new(),
            scopes: Vec::new(),
            pending_opens: 0,
            active_depth: 0,
            pending_closes: 0,
            scope_restored: false,
        }
    }
}

impl Path {
    /// The name given at compile time (used in error reporting).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The original template text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Toggles whether a field lookup that matches nothing is an error or
    /// an empty result. Consumes and returns the path for chaining.
    pub fn allow_missing_keys(mut self, allow: bool) -> Self {
        self.allow_missing_keys = allow;
        self
    }

    /// Evaluates the path against a root value, producing one ordered group
    /// of values per top-level template node, with `range` blocks expanded
    /// into one set of groups per loop candidate.
    pub fn evaluate(&self, root: &Value) -> Result<Vec<Vec<Value>>, EvalError> {
        let mut ctx = EvalContext::new();
        let mut groups = Vec::new();
        self.eval_nodes(&mut ctx, root.clone(), &self.nodes, &mut groups)?;
        Ok(groups)
    }

    /// Walks a top-level node sequence with `root` as the current scope.
    /// Recurses once per loop candidate when a `range` fires.
    fn eval_nodes(
        &self,
        ctx: &mut EvalContext,
        root: Value,
        nodes: &[Node],
        groups: &mut Vec<Vec<Value>>,
    ) -> Result<(), EvalError> {
        ctx.current = vec![root];
        for (i, node) in nodes.iter().enumerate() {
            let input = ctx.current.clone();
            let results = self.walk(ctx, input, node)?;

            // an `end` that closed this loop level restored the outer
            // scope; it emits no group and the walk continues
            if ctx.scope_restored {
                ctx.scope_restored = false;
                continue;
            }
            // an `end` belonging to this iteration's body: the body is done
            if ctx.pending_closes > 0 && ctx.pending_closes <= ctx.active_depth {
                ctx.pending_closes -= 1;
                break;
            }
            // a `range` fired: re-evaluate the remaining nodes once per
            // candidate, each candidate becoming the new root
            if ctx.pending_opens > 0 {
                ctx.pending_opens -= 1;
                ctx.active_depth += 1;
                let rest = &nodes[i + 1..];
                let count = results.len();
                for (k, value) in results.into_iter().enumerate() {
                    if k + 1 == count {
                        // signal the closing iteration to nested `end`s
                        ctx.active_depth -= 1;
                    }
                    self.eval_nodes(ctx, value, rest, groups)?;
                }
                break;
            }
            groups.push(results);
        }
        Ok(())
    }

    /// Dispatches one node against the current candidates.
    fn walk(
        &self,
        ctx: &mut EvalContext,
        input: Vec<Value>,
        node: &Node,
    ) -> Result<Vec<Value>, EvalError> {
        match node {
            Node::List(nodes) => self.eval_list(ctx, input, nodes),
            Node::Text(text) => Ok(vec![Value::String(text.clone())]),
            Node::Field(name) => self.eval_field(input, name),
            Node::Array(params) => self.eval_array(input, params),
            Node::Filter {
                left,
                right,
                operator,
            } => self.eval_filter(ctx, input, left, right, operator),
            Node::Int(n) => Ok(vec![Value::Int(*n); input.len()]),
            Node::Float(x) => Ok(vec![Value::Float(*x); input.len()]),
            Node::Bool(b) => Ok(vec![Value::Bool(*b); input.len()]),
            Node::Wildcard => Ok(self.eval_wildcard(input)),
            Node::Recursive => Ok(self.eval_recursive(input)),
            Node::Union(branches) => self.eval_union(ctx, input, branches),
            Node::Identifier(name) => self.eval_identifier(ctx, input, name),
        }
    }

    /// Threads candidates through a pipeline of steps: the output of step
    /// `i` is the input of step `i + 1`.
    fn eval_list(
        &self,
        ctx: &mut EvalContext,
        input: Vec<Value>,
        nodes: &[Node],
    ) -> Result<Vec<Value>, EvalError> {
        let mut current = input;
        for node in nodes {
            current = self.walk(ctx, current, node)?;
        }
        Ok(current)
    }

    /// `range` and `end`: the loop-controller transitions.
    fn eval_identifier(
        &self,
        ctx: &mut EvalContext,
        input: Vec<Value>,
        name: &str,
    ) -> Result<Vec<Value>, EvalError> {
        match name {
            "range" => {
                ctx.scopes.push(ctx.current.clone());
                ctx.pending_opens += 1;
                Ok(input)
            }
            "end" => {
                if ctx.pending_closes < ctx.active_depth {
                    // belongs to an inner, still-open range; defer
                    ctx.pending_closes += 1;
                    Ok(Vec::new())
                } else {
                    match ctx.scopes.pop() {
                        Some(outer) => {
                            ctx.current = outer;
                            ctx.scope_restored = true;
                            Ok(Vec::new())
                        }
                        None => Err(EvalError::UnboundEnd),
                    }
                }
            }
            other => Err(EvalError::UnrecognizedIdentifier(other.to_string())),
        }
    }

    /// Resolves a field name against each candidate record or map.
    fn eval_field(&self, input: Vec<Value>, name: &str) -> Result<Vec<Value>, EvalError> {
        let mut results = Vec::new();
        if input.is_empty() {
            return Ok(results);
        }
        for value in &input {
            let Some(value) = value.dereference() else {
                continue;
            };
            match value {
                Value::Record(record) => {
                    if let Some(found) = find_field_in_record(record, name) {
                        results.push(found.clone());
                    }
                }
                Value::Map(map) => {
                    let key = convert_key(name, map.kind())?;
                    if let Some(found) = map.get(&key) {
                        results.push(found.clone());
                    }
                }
                _ => {}
            }
        }
        if results.is_empty() {
            if self.allow_missing_keys {
                return Ok(results);
            }
            return Err(EvalError::FieldNotFound(name.to_string()));
        }
        Ok(results)
    }

    /// Python-style slicing over each candidate sequence, fanning the
    /// selected elements out into one candidate set.
    fn eval_array(
        &self,
        input: Vec<Value>,
        params: &[SliceParam; 3],
    ) -> Result<Vec<Value>, EvalError> {
        let mut results = Vec::new();
        for value in &input {
            let Some(value) = value.dereference() else {
                continue;
            };
            let Value::Sequence(elements) = value else {
                return Err(EvalError::TypeMismatch(format!(
                    "{} is not a sequence and cannot be sliced",
                    value.kind_name()
                )));
            };
            let length = elements.len() as i64;

            let mut start = if params[0].known { params[0].value } else { 0 };
            if start < 0 {
                start += length;
            }
            let mut end = if params[1].known { params[1].value } else { length };
            if end < 0 {
                end += length;
            }

            // an explicit empty selection is always permitted, whatever the
            // bounds
            if start != end {
                if start < 0 || start >= length {
                    return Err(EvalError::IndexOutOfBounds {
                        index: start,
                        length: elements.len(),
                    });
                }
                if end < 0 || end > length {
                    return Err(EvalError::IndexOutOfBounds {
                        index: end - 1,
                        length: elements.len(),
                    });
                }
            }

            if params[2].known {
                let step = params[2].value;
                if step <= 0 {
                    return Err(EvalError::InvalidStep(step));
                }
                let mut i = start;
                while i < end {
                    results.push(elements[i as usize].clone());
                    i += step;
                }
            } else {
                for i in start..end {
                    results.push(elements[i as usize].clone());
                }
            }
        }
        Ok(results)
    }

    /// The immediate children of every candidate.
    fn eval_wildcard(&self, input: Vec<Value>) -> Vec<Value> {
        let mut results = Vec::new();
        for value in &input {
            let Some(value) = value.dereference() else {
                continue;
            };
            results.extend(value.children());
        }
        results
    }

    /// Depth-first, pre-order descent: each candidate with children is
    /// emitted itself, followed by the descent through its children.
    fn eval_recursive(&self, input: Vec<Value>) -> Vec<Value> {
        let mut results = Vec::new();
        for value in &input {
            let Some(value) = value.dereference() else {
                continue;
            };
            let children = value.children();
            if !children.is_empty() {
                results.push(value.clone());
                results.extend(self.eval_recursive(children));
            }
        }
        results
    }

    /// Every branch evaluated against every candidate, candidate-major.
    fn eval_union(
        &self,
        ctx: &mut EvalContext,
        input: Vec<Value>,
        branches: &[Vec<Node>],
    ) -> Result<Vec<Value>, EvalError> {
        let mut results = Vec::new();
        for value in input {
            for branch in branches {
                let partial = self.eval_list(ctx, vec![value.clone()], branch)?;
                results.extend(partial);
            }
        }
        Ok(results)
    }

    /// Filters each element of every candidate sequence through the
    /// predicate, with the element as the evaluation root.
    fn eval_filter(
        &self,
        ctx: &mut EvalContext,
        input: Vec<Value>,
        left: &[Node],
        right: &[Node],
        operator: &str,
    ) -> Result<Vec<Value>, EvalError> {
        let mut results = Vec::new();
        for value in &input {
            let Some(value) = value.dereference() else {
                return Err(EvalError::TypeMismatch(
                    "null is not a sequence and cannot be filtered".to_string(),
                ));
            };
            let Value::Sequence(elements) = value else {
                return Err(EvalError::TypeMismatch(format!(
                    "{} is not a sequence and cannot be filtered",
                    value.kind_name()
                )));
            };
            for element in elements {
                let scoped = vec![element.clone()];

                if operator == "exists" {
                    // a failed sub-evaluation means "does not exist", not
                    // an abort
                    let lefts = self.eval_list(ctx, scoped, left).unwrap_or_default();
                    if !lefts.is_empty() {
                        results.push(element.clone());
                    }
                    continue;
                }

                let lefts = self.eval_list(ctx, scoped.clone(), left)?;
                match lefts.len() {
                    0 => continue,
                    1 => {}
                    n => return Err(EvalError::Cardinality(n)),
                }
                let rights = self.eval_list(ctx, scoped, right)?;
                match rights.len() {
                    0 => continue,
                    1 => {}
                    n => return Err(EvalError::Cardinality(n)),
                }

                let pass = match operator {
                    "<" => compare::less(&lefts[0], &rights[0])?,
                    ">" => compare::greater(&lefts[0], &rights[0])?,
                    "==" => compare::equal(&lefts[0], &rights[0])?,
                    "!=" => compare::not_equal(&lefts[0], &rights[0])?,
                    "<=" => compare::less_equal(&lefts[0], &rights[0])?,
                    ">=" => compare::greater_equal(&lefts[0], &rights[0])?,
                    other => return Err(EvalError::UnrecognizedOperator(other.to_string())),
                };
                if pass {
                    results.push(element.clone());
                }
            }
        }
        Ok(results)
    }
}

/// Resolves a field name against a record's declared fields: serialization
/// aliases first, then the promoted fields of inline embedded records, and
/// finally an exact match on the declared field name.
fn find_field_in_record<'a>(record: &'a Record, name: &str) -> Option<&'a Value> {
    for field in record.fields() {
        if field.alias.as_deref() == Some(name) {
            return Some(&field.value);
        }
    }
    for field in record.fields() {
        if field.inline && field.alias.is_none() {
            if let Some(Value::Record(inner)) = field.value.dereference() {
                if let Some(found) = find_field_in_record(inner, name) {
                    return Some(found);
                }
            }
        }
    }
    record
        .fields()
        .iter()
        .find(|field| field.name == name)
        .map(|field| &field.value)
}

/// Converts a requested field name to the map's key kind.
fn convert_key(name: &str, kind: KeyKind) -> Result<Key, EvalError> {
    match kind {
        KeyKind::String => Ok(Key::String(name.to_string())),
        KeyKind::Int => name
            .parse::<i64>()
            .map(Key::Int)
            .map_err(|_| EvalError::KeyConversion {
                name: name.to_string(),
                kind: kind.name(),
            }),
        KeyKind::Bool => name
            .parse::<bool>()
            .map(Key::Bool)
            .map_err(|_| EvalError::KeyConversion {
                name: name.to_string(),
                kind: kind.name(),
            }),
    }
}
