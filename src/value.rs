//! The dynamic value model the evaluator navigates.
//!
//! Values form an owned tree: scalars, sequences, insertion-ordered maps
//! with a fixed key kind, records with declared fields (optionally aliased
//! or inlined), and nullable references. The evaluator never mutates a
//! value it is given; it only reads, dereferences, and slices.
//!
//! Because the tree is owned and contains no shared or back references,
//! cycles are unrepresentable and traversal is bounded by tree depth.

use indexmap::IndexMap;

/// A runtime value navigated by a compiled path.
///
/// # Examples
///
/// ```
/// use treepath::{Map, Value};
///
/// let doc = Value::Map(Map::from_iter([
///     ("name".to_string(), Value::String("ferris".to_string())),
///     ("age".to_string(), Value::Int(13)),
/// ]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value
    Null,

    /// Boolean
    Bool(bool),

    /// Integer number (kept separate from floats)
    Int(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Ordered, indexable, sliceable elements
    Sequence(Vec<Value>),

    /// Associative map with a fixed key kind and insertion-ordered entries
    Map(Map),

    /// Named fields with optional aliases and inline promotion
    Record(Record),

    /// Nullable indirection; must be dereferenced before inspection
    Reference(Option<Box<Value>>),
}

impl Value {
    /// Returns a human-readable name for the value's kind, for error
    /// messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Map(_) => "map",
            Value::Record(_) => "record",
            Value::Reference(_) => "reference",
        }
    }

    /// Follows reference chains down to a concrete value.
    ///
    /// Returns `None` for a null reference (or `Null` itself): such a
    /// candidate contributes no match during field or array access rather
    /// than failing.
    pub fn dereference(&self) -> Option<&Value> {
        let mut current = self;
        loop {
            match current {
                Value::Reference(Some(inner)) => current = inner,
                Value::Reference(None) | Value::Null => return None,
                other => return Some(other),
            }
        }
    }

    /// Enumerates the immediate children of a container value.
    ///
    /// Record fields come in declaration order, map values in insertion
    /// order, sequence elements in order, string characters in order.
    /// Scalars have no children.
    pub fn children(&self) -> Vec<Value> {
        match self {
            Value::Record(record) => record
                .fields()
                .iter()
                .map(|field| field.value.clone())
                .collect(),
            Value::Map(map) => map.values().cloned().collect(),
            Value::Sequence(elements) => elements.clone(),
            Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
            _ => Vec::new(),
        }
    }
}

/// The kind of key a [`Map`] is declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    String,
    Int,
    Bool,
}

impl KeyKind {
    pub fn name(self) -> &'static str {
        match self {
            KeyKind::String => "string",
            KeyKind::Int => "int",
            KeyKind::Bool => "bool",
        }
    }
}

/// A map key. All keys of one map share a single kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    String(String),
    Int(i64),
    Bool(bool),
}

impl Key {
    pub fn kind(&self) -> KeyKind {
        match self {
            Key::String(_) => KeyKind::String,
            Key::Int(_) => KeyKind::Int,
            Key::Bool(_) => KeyKind::Bool,
        }
    }
}

/// An associative map with insertion-ordered entries and a fixed key kind.
///
/// The key kind is declared up front (or by the `FromIterator` impl used to
/// build the map) so that key conversion during field access stays
/// well-defined even for empty maps.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    kind: KeyKind,
    entries: IndexMap<Key, Value>,
}

impl Map {
    /// Creates an empty map with the given key kind.
    pub fn new(kind: KeyKind) -> Self {
        Map {
            kind,
            entries: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Map {
            kind: KeyKind::String,
            entries: iter
                .into_iter()
                .map(|(k, v)| (Key::String(k), v))
                .collect(),
        }
    }
}

impl FromIterator<(i64, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (i64, Value)>>(iter: I) -> Self {
        Map {
            kind: KeyKind::Int,
            entries: iter.into_iter().map(|(k, v)| (Key::Int(k), v)).collect(),
        }
    }
}

impl FromIterator<(bool, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (bool, Value)>>(iter: I) -> Self {
        Map {
            kind: KeyKind::Bool,
            entries: iter.into_iter().map(|(k, v)| (Key::Bool(k), v)).collect(),
        }
    }
}

/// A value with declared, ordered, named fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fields: Vec<RecordField>,
}

impl Record {
    pub fn new(fields: Vec<RecordField>) -> Self {
        Record { fields }
    }

    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }
}

/// One declared field of a [`Record`].
///
/// Field resolution consults the serialization `alias` first; unaliased
/// fields marked `inline` have their own record fields promoted into the
/// parent's namespace; the declared `name` is the final fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub alias: Option<String>,
    pub inline: bool,
    pub value: Value,
}

impl RecordField {
    /// A plain field matched by its declared name.
    pub fn named(name: impl Into<String>, value: Value) -> Self {
        RecordField {
            name: name.into(),
            alias: None,
            inline: false,
            value,
        }
    }

    /// A field matched by its serialization alias.
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>, value: Value) -> Self {
        RecordField {
            name: name.into(),
            alias: Some(alias.into()),
            inline: false,
            value,
        }
    }

    /// An unaliased embedded field whose own fields resolve as if they were
    /// declared on the parent.
    pub fn inline(name: impl Into<String>, value: Value) -> Self {
        RecordField {
            name: name.into(),
            alias: None,
            inline: true,
            value,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

#[test]
fn dereference_follows_chains() {
    let v = Value::Reference(Some(Box::new(Value::Reference(Some(Box::new(
        Value::Int(7),
    ))))));
    assert_eq!(v.dereference(), Some(&Value::Int(7)));
    assert_eq!(Value::Reference(None).dereference(), None);
    assert_eq!(Value::Null.dereference(), None);
}

#[test]
fn children_enumerate_in_order() {
    let seq = Value::Sequence(vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(seq.children(), vec![Value::Int(1), Value::Int(2)]);

    let map = Value::Map(Map::from_iter([
        ("b".to_string(), Value::Int(2)),
        ("a".to_string(), Value::Int(1)),
    ]));
    // insertion order, not key order
    assert_eq!(map.children(), vec![Value::Int(2), Value::Int(1)]);

    assert_eq!(Value::Int(3).children(), Vec::<Value>::new());
}
