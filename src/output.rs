//! JSON-style rendering of dynamic values for display.
//!
//! Records render as objects keyed by alias (falling back to the declared
//! name), maps render in insertion order, and references render as the
//! value they point at (or `null`). Output is deterministic: the value
//! model itself carries a stable order, so no sorting is needed.

use crate::value::{Key, Value};

pub struct Printer {
    pretty: bool,
}

impl Printer {
    pub fn new(pretty: bool) -> Self {
        Printer { pretty }
    }

    pub fn print(&self, value: &Value) -> String {
        self.print_value(value, 0)
    }

    fn print_value(&self, value: &Value, indent: usize) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(x) => x.to_string(),
            Value::String(s) => format!("\"{}\"", escape_string(s)),
            Value::Sequence(elements) => self.print_sequence(elements, indent),
            Value::Map(map) => {
                let entries: Vec<(String, &Value)> = map
                    .iter()
                    .map(|(key, value)| (key_text(key), value))
                    .collect();
                self.print_entries(&entries, indent)
            }
            Value::Record(record) => {
                let entries: Vec<(String, &Value)> = record
                    .fields()
                    .iter()
                    .map(|field| {
                        let name = field.alias.as_deref().unwrap_or(&field.name);
                        (name.to_string(), &field.value)
                    })
                    .collect();
                self.print_entries(&entries, indent)
            }
            Value::Reference(Some(inner)) => self.print_value(inner, indent),
            Value::Reference(None) => "null".to_string(),
        }
    }

    fn print_sequence(&self, elements: &[Value], indent: usize) -> String {
        if elements.is_empty() {
            return "[]".to_string();
        }
        if self.pretty {
            let items: Vec<String> = elements
                .iter()
                .map(|v| format!("{}{}", pad(indent + 1), self.print_value(v, indent + 1)))
                .collect();
            format!("[\n{}\n{}]", items.join(",\n"), pad(indent))
        } else {
            let items: Vec<String> = elements.iter().map(|v| self.print_value(v, indent)).collect();
            format!("[{}]", items.join(","))
        }
    }

    fn print_entries(&self, entries: &[(String, &Value)], indent: usize) -> String {
        if entries.is_empty() {
            return "{}".to_string();
        }
        if self.pretty {
            let items: Vec<String> = entries
                .iter()
                .map(|(name, value)| {
                    format!(
                        "{}\"{}\": {}",
                        pad(indent + 1),
                        escape_string(name),
                        self.print_value(value, indent + 1)
                    )
                })
                .collect();
            format!("{{\n{}\n{}}}", items.join(",\n"), pad(indent))
        } else {
            let items: Vec<String> = entries
                .iter()
                .map(|(name, value)| {
                    format!("\"{}\":{}", escape_string(name), self.print_value(value, indent))
                })
                .collect();
            format!("{{{}}}", items.join(","))
        }
    }
}

fn key_text(key: &Key) -> String {
    match key {
        Key::String(s) => s.clone(),
        Key::Int(n) => n.to_string(),
        Key::Bool(b) => b.to_string(),
    }
}

fn pad(level: usize) -> String {
    "  ".repeat(level)
}

fn escape_string(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            '\n' => vec!['\\', 'n'],
            '\r' => vec!['\\', 'r'],
            '\t' => vec!['\\', 't'],
            c if c.is_control() => format!("\\u{:04x}", c as u32).chars().collect(),
            c => vec![c],
        })
        .collect()
}

/// Compact JSON rendering of a value.
///
/// # Examples
///
/// ```
/// use treepath::{to_json, Map, Value};
///
/// let v = Value::Map(Map::from_iter([
///     ("a".to_string(), Value::Int(1)),
///     ("b".to_string(), Value::Sequence(vec![Value::Bool(true)])),
/// ]));
/// assert_eq!(to_json(&v), r#"{"a":1,"b":[true]}"#);
/// ```
pub fn to_json(value: &Value) -> String {
    Printer::new(false).print(value)
}

/// Pretty-printed JSON rendering with two-space indentation.
pub fn to_json_pretty(value: &Value) -> String {
    Printer::new(true).print(value)
}

#[test]
fn records_render_by_alias() {
    use crate::value::{Record, RecordField};

    let v = Value::Record(Record::new(vec![
        RecordField::aliased("user_name", "name", Value::String("ada".to_string())),
        RecordField::named("age", Value::Int(36)),
    ]));
    assert_eq!(to_json(&v), r#"{"name":"ada","age":36}"#);
}

#[test]
fn references_render_transparently() {
    let v = Value::Sequence(vec![
        Value::Reference(Some(Box::new(Value::Int(1)))),
        Value::Reference(None),
    ]);
    assert_eq!(to_json(&v), "[1,null]");
}
