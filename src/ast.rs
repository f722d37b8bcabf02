//! Compiled representation of a path template.
//!
//! A template like `{.items[*].name}` is compiled once by the parser into a
//! list of [`Node`]s and then evaluated any number of times. Nodes are plain
//! data: the parser is the only producer and the evaluator only reads them.

/// One slice parameter of an array access: `[start:end:step]`.
///
/// `known` records whether the parameter was written out in the template.
/// Unspecified parameters take positional defaults at evaluation time
/// (start 0, end sequence length, step absent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SliceParam {
    pub known: bool,
    pub value: i64,
}

impl SliceParam {
    pub fn known(value: i64) -> Self {
        SliceParam { known: true, value }
    }

    pub fn unknown() -> Self {
        SliceParam::default()
    }
}

/// A node of a compiled path template.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A pipeline of steps evaluated left to right; the output candidates
    /// of one step are the input of the next. Every `{...}` group in a
    /// template compiles to one `List`.
    List(Vec<Node>),

    /// Verbatim template text outside braces, emitted as a string value.
    Text(String),

    /// Field access by name: `.name` or `['name']`.
    Field(String),

    /// Array slice: `[i]`, `[a:b]`, `[a:b:s]`, with Python-style negative
    /// indices. Parameters are start, end, step in that order.
    Array([SliceParam; 3]),

    /// Predicate filter over a sequence: `[?(@.age > 30)]`.
    ///
    /// `left` and `right` are sub-pipelines evaluated with the sequence
    /// element as root. The operator is kept as written; `"exists"` marks a
    /// bare-path existence test with an unused `right`.
    Filter {
        left: Vec<Node>,
        right: Vec<Node>,
        operator: String,
    },

    /// Integer literal.
    Int(i64),

    /// Float literal.
    Float(f64),

    /// Boolean literal.
    Bool(bool),

    /// All immediate children of each candidate: `*` or `[*]`.
    Wildcard,

    /// Recursive descent: `..`.
    Recursive,

    /// Union of branches: `[a,b]`. Each branch is a pipeline evaluated
    /// against every candidate in turn.
    Union(Vec<Vec<Node>>),

    /// Bareword identifier. `range` and `end` drive the loop controller;
    /// anything else is rejected at evaluation time.
    Identifier(String),
}
