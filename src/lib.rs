pub mod ast;
pub mod compare;
pub mod evaluator;
pub mod output;
pub mod parser;
pub mod value;

pub use ast::{Node, SliceParam};
pub use compare::CompareError;
pub use evaluator::{EvalError, Path, compile};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, parse};
pub use value::{Key, KeyKind, Map, Record, RecordField, Value};
