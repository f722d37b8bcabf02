//! Template text to AST.
//!
//! A template interleaves raw text with `{...}` path groups, so parsing is
//! a single pass over the characters rather than a separate token stream:
//! text mode collects verbatim characters, and brace mode parses path
//! segments until the closing `}`.
//!
//! ```text
//! name={.user.name} roles={range .roles[*]}{@} {end}
//! ```

use std::mem;

use crate::ast::{Node, SliceParam};

/// A syntax error, with the template name and the character position the
/// parser had reached.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub name: String,
    pub position: usize,
    pub message: String,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "parse error in {} at position {}: {}",
            self.name, self.position, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Parses template text into the top-level node list consumed by the
/// evaluator.
pub fn parse(name: &str, text: &str) -> Result<Vec<Node>, ParseError> {
    Parser::new(name, text).parse_template()
}

struct Parser {
    name: String,
    input: Vec<char>,
    position: usize,
}

impl Parser {
    fn new(name: &str, text: &str) -> Self {
        Parser {
            name: name.to_string(),
            input: text.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            name: self.name.clone(),
            position: self.position,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn parse_template(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        let mut text = String::new();
        while let Some(ch) = self.current_char() {
            match ch {
                '{' => {
                    if !text.is_empty() {
                        nodes.push(Node::Text(mem::take(&mut text)));
                    }
                    self.advance();
                    let group = self.parse_expression(true)?;
                    nodes.push(Node::List(group));
                }
                '}' => return Err(self.error("unexpected '}' outside a template group")),
                _ => {
                    text.push(ch);
                    self.advance();
                }
            }
        }
        if !text.is_empty() {
            nodes.push(Node::Text(text));
        }
        Ok(nodes)
    }

    /// Parses path segments. In brace mode the closing `}` terminates (and
    /// is consumed); otherwise the end of input does, which is how filter
    /// operand fragments are parsed.
    fn parse_expression(&mut self, in_braces: bool) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(ch) = self.current_char() else {
                if in_braces {
                    return Err(self.error("unclosed template group"));
                }
                return Ok(nodes);
            };
            match ch {
                '}' if in_braces => {
                    self.advance();
                    return Ok(nodes);
                }
                // both refer to the current scope and compile to nothing
                '$' | '@' => self.advance(),
                '.' => {
                    self.advance();
                    if self.current_char() == Some('.') {
                        self.advance();
                        nodes.push(Node::Recursive);
                        if self.current_char().is_some_and(is_field_char) {
                            let name = self.read_field_name();
                            nodes.push(Node::Field(name));
                        }
                    } else if self.current_char() == Some('*') {
                        self.advance();
                        nodes.push(Node::Wildcard);
                    } else if self.current_char().is_some_and(is_field_char) {
                        let name = self.read_field_name();
                        nodes.push(Node::Field(name));
                    } else {
                        return Err(self.error("expected a field name after '.'"));
                    }
                }
                '*' => {
                    self.advance();
                    nodes.push(Node::Wildcard);
                }
                '[' => {
                    self.advance();
                    nodes.push(self.parse_bracket()?);
                }
                '\'' | '"' => {
                    let s = self.read_quoted(ch)?;
                    nodes.push(Node::Text(s));
                }
                c if c.is_ascii_digit() || c == '-' || c == '+' => {
                    nodes.push(self.read_number()?);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.read_identifier();
                    match word.as_str() {
                        "true" => nodes.push(Node::Bool(true)),
                        "false" => nodes.push(Node::Bool(false)),
                        _ => nodes.push(Node::Identifier(word)),
                    }
                }
                c => return Err(self.error(format!("unexpected character '{}'", c))),
            }
        }
    }

    /// Parses the inside of a `[...]` segment: wildcard, quoted or bare
    /// field, slice, union, or filter. The opening `[` is already consumed.
    fn parse_bracket(&mut self) -> Result<Node, ParseError> {
        self.skip_whitespace();
        if self.current_char() == Some('?') {
            return self.parse_filter();
        }
        let content = self.read_until_bracket_close()?;
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(self.error("empty bracket expression"));
        }
        if trimmed == "*" {
            return Ok(Node::Wildcard);
        }
        let parts = split_top_level(trimmed, ',');
        if parts.len() > 1 {
            let mut branches = Vec::with_capacity(parts.len());
            for part in parts {
                branches.push(vec![self.parse_bracket_part(part.trim())?]);
            }
            return Ok(Node::Union(branches));
        }
        self.parse_bracket_part(trimmed)
    }

    /// One comma-separated bracket entry: a quoted or bare field name, a
    /// single index, or a slice.
    fn parse_bracket_part(&self, part: &str) -> Result<Node, ParseError> {
        if part.is_empty() {
            return Err(self.error("empty bracket expression"));
        }
        let first = part.chars().next().unwrap_or_default();
        if first == '\'' || first == '"' {
            if part.len() >= 2 && part.ends_with(first) {
                return Ok(Node::Field(part[1..part.len() - 1].to_string()));
            }
            return Err(self.error("unterminated quoted field"));
        }
        if first.is_alphabetic() || first == '_' {
            return Ok(Node::Field(part.to_string()));
        }

        let segments: Vec<&str> = part.split(':').collect();
        if segments.len() > 3 {
            return Err(self.error("too many slice parameters"));
        }
        let mut params = [SliceParam::unknown(); 3];
        for (i, segment) in segments.iter().enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let value: i64 = segment
                .parse()
                .map_err(|_| self.error(format!("invalid array index '{}'", segment)))?;
            params[i] = SliceParam::known(value);
        }
        if segments.len() == 1 {
            // [i] selects one element: [i:i+1], except [-1] whose end stays
            // open so it reaches the final element
            let index = params[0].value;
            if index != -1 {
                params[1] = SliceParam::known(index + 1);
            }
        }
        Ok(Node::Array(params))
    }

    /// Parses `?(...)]` into a filter node. The `?` is still current.
    fn parse_filter(&mut self) -> Result<Node, ParseError> {
        self.advance();
        if self.current_char() != Some('(') {
            return Err(self.error("expected '(' after '?'"));
        }
        self.advance();
        let content = self.read_balanced_parens()?;
        self.skip_whitespace();
        if self.current_char() != Some(']') {
            return Err(self.error("expected ']' to close filter"));
        }
        self.advance();

        match split_filter(&content) {
            Some((left_text, operator, right_text)) => Ok(Node::Filter {
                left: self.parse_filter_operand(&left_text)?,
                right: self.parse_filter_operand(&right_text)?,
                operator,
            }),
            None => Ok(Node::Filter {
                left: self.parse_filter_operand(&content)?,
                right: Vec::new(),
                operator: "exists".to_string(),
            }),
        }
    }

    /// One side of a filter predicate: a sub-path rooted at the current
    /// element, or a literal.
    fn parse_filter_operand(&self, fragment: &str) -> Result<Vec<Node>, ParseError> {
        let t = fragment.trim();
        if t.is_empty() {
            return Err(self.error("empty filter operand"));
        }
        let first = t.chars().next().unwrap_or_default();
        if first == '@' || first == '$' {
            return Parser::new(&self.name, t).parse_expression(false);
        }
        if first == '\'' || first == '"' {
            if t.len() >= 2 && t.ends_with(first) {
                return Ok(vec![Node::Text(t[1..t.len() - 1].to_string())]);
            }
            return Err(self.error("unterminated string literal in filter"));
        }
        if t == "true" {
            return Ok(vec![Node::Bool(true)]);
        }
        if t == "false" {
            return Ok(vec![Node::Bool(false)]);
        }
        if let Ok(i) = t.parse::<i64>() {
            return Ok(vec![Node::Int(i)]);
        }
        if let Ok(x) = t.parse::<f64>() {
            return Ok(vec![Node::Float(x)]);
        }
        Err(self.error(format!("invalid filter operand '{}'", t)))
    }

    /// Collects everything up to the closing `]` (consumed), honoring
    /// quotes so `['a,b']` stays one entry.
    fn read_until_bracket_close(&mut self) -> Result<String, ParseError> {
        let mut content = String::new();
        let mut quote: Option<char> = None;
        while let Some(ch) = self.current_char() {
            match quote {
                Some(q) => {
                    if ch == q {
                        quote = None;
                    }
                    content.push(ch);
                    self.advance();
                }
                None => match ch {
                    ']' => {
                        self.advance();
                        return Ok(content);
                    }
                    '\'' | '"' => {
                        quote = Some(ch);
                        content.push(ch);
                        self.advance();
                    }
                    _ => {
                        content.push(ch);
                        self.advance();
                    }
                },
            }
        }
        Err(self.error("unclosed '['"))
    }

    /// Collects the body of an already-opened parenthesis, consuming the
    /// matching `)` but not including it.
    fn read_balanced_parens(&mut self) -> Result<String, ParseError> {
        let mut content = String::new();
        let mut depth = 1usize;
        let mut quote: Option<char> = None;
        while let Some(ch) = self.current_char() {
            if let Some(q) = quote {
                if ch == q {
                    quote = None;
                }
            } else {
                match ch {
                    '\'' | '"' => quote = Some(ch),
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            self.advance();
                            return Ok(content);
                        }
                    }
                    _ => {}
                }
            }
            content.push(ch);
            self.advance();
        }
        Err(self.error("unclosed '(' in filter"))
    }

    fn read_field_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.current_char() {
            if is_field_char(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        name
    }

    fn read_identifier(&mut self) -> String {
        let mut word = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        word
    }

    fn read_quoted(&mut self, quote: char) -> Result<String, ParseError> {
        let mut result = String::new();
        self.advance(); // opening quote
        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some(c) => {
                            return Err(self.error(format!("invalid escape sequence: \\{}", c)));
                        }
                        None => return Err(self.error("unexpected end of input after backslash")),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }
        Err(self.error("unterminated string: missing closing quote"))
    }

    fn read_number(&mut self) -> Result<Node, ParseError> {
        let mut number = String::new();
        let mut is_float = false;
        if matches!(self.current_char(), Some('-') | Some('+')) {
            number.push(self.current_char().unwrap_or_default());
            self.advance();
        }
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.' && !is_float {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        if is_float {
            number
                .parse::<f64>()
                .map(Node::Float)
                .map_err(|_| self.error(format!("invalid float literal '{}'", number)))
        } else {
            number
                .parse::<i64>()
                .map(Node::Int)
                .map_err(|_| self.error(format!("invalid integer literal '{}'", number)))
        }
    }
}

fn is_field_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-'
}

/// Splits on a separator at the top level only, skipping quoted regions.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                c if c == separator => {
                    parts.push(&text[start..i]);
                    start = i + ch.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Finds the first relational operator outside quotes and splits the
/// predicate around it. Two-character operators are matched before their
/// one-character prefixes.
fn split_filter(content: &str) -> Option<(String, String, String)> {
    let chars: Vec<char> = content.chars().collect();
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '<' | '>' | '=' | '!' => {
                    let two = chars.get(i + 1) == Some(&'=');
                    let operator = if two {
                        format!("{}=", ch)
                    } else {
                        ch.to_string()
                    };
                    // lone '=' or '!' is not an operator
                    if operator == "=" || operator == "!" {
                        i += 1;
                        continue;
                    }
                    let left: String = chars[..i].iter().collect();
                    let right: String = chars[i + if two { 2 } else { 1 }..].iter().collect();
                    return Some((left, operator, right));
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

#[test]
fn parses_fields_and_wildcards() {
    let nodes = parse("t", "{.items[*].name}").unwrap();
    assert_eq!(
        nodes,
        vec![Node::List(vec![
            Node::Field("items".to_string()),
            Node::Wildcard,
            Node::Field("name".to_string()),
        ])]
    );
}

#[test]
fn parses_text_around_groups() {
    let nodes = parse("t", "x={.a}!").unwrap();
    assert_eq!(
        nodes,
        vec![
            Node::Text("x=".to_string()),
            Node::List(vec![Node::Field("a".to_string())]),
            Node::Text("!".to_string()),
        ]
    );
}

#[test]
fn parses_slices() {
    let nodes = parse("t", "{.items[1:3]}").unwrap();
    let expected = Node::Array([
        SliceParam::known(1),
        SliceParam::known(3),
        SliceParam::unknown(),
    ]);
    assert_eq!(
        nodes,
        vec![Node::List(vec![
            Node::Field("items".to_string()),
            expected
        ])]
    );

    // [2] is sugar for [2:3]; [-1] leaves the end open
    let nodes = parse("t", "{.items[2]}{.items[-1]}").unwrap();
    assert_eq!(
        nodes[0],
        Node::List(vec![
            Node::Field("items".to_string()),
            Node::Array([
                SliceParam::known(2),
                SliceParam::known(3),
                SliceParam::unknown()
            ]),
        ])
    );
    assert_eq!(
        nodes[1],
        Node::List(vec![
            Node::Field("items".to_string()),
            Node::Array([
                SliceParam::known(-1),
                SliceParam::unknown(),
                SliceParam::unknown()
            ]),
        ])
    );
}

#[test]
fn parses_filters() {
    let nodes = parse("t", "{.items[?(@.age > 30)]}").unwrap();
    assert_eq!(
        nodes,
        vec![Node::List(vec![
            Node::Field("items".to_string()),
            Node::Filter {
                left: vec![Node::Field("age".to_string())],
                right: vec![Node::Int(30)],
                operator: ">".to_string(),
            },
        ])]
    );

    let nodes = parse("t", "{.items[?(@.missing)]}").unwrap();
    assert_eq!(
        nodes,
        vec![Node::List(vec![
            Node::Field("items".to_string()),
            Node::Filter {
                left: vec![Node::Field("missing".to_string())],
                right: vec![],
                operator: "exists".to_string(),
            },
        ])]
    );
}

#[test]
fn parses_unions_and_identifiers() {
    let nodes = parse("t", "{[a,'b c']}").unwrap();
    assert_eq!(
        nodes,
        vec![Node::List(vec![Node::Union(vec![
            vec![Node::Field("a".to_string())],
            vec![Node::Field("b c".to_string())],
        ])])]
    );

    let nodes = parse("t", "{range .xs[*]}{end}").unwrap();
    assert_eq!(
        nodes[0],
        Node::List(vec![
            Node::Identifier("range".to_string()),
            Node::Field("xs".to_string()),
            Node::Wildcard,
        ])
    );
    assert_eq!(nodes[1], Node::List(vec![Node::Identifier("end".to_string())]));
}

#[test]
fn rejects_malformed_templates() {
    assert!(parse("t", "{.a").is_err());
    assert!(parse("t", "}").is_err());
    assert!(parse("t", "{.items[1:2:3:4]}").is_err());
    assert!(parse("t", "{.items[?(@.a > )]}").is_err());
}
