//! In-memory S-expression tree
//!
//! A [`Node`] is a tagged value plus the position of its first token.
//! Equality is structural: positions are ignored, so two documents that
//! differ only in whitespace compare equal.

use super::lexer::{Lexer, Token, TokenKind};
use super::numeric::{parse_double, NumericScope};
use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Atom(String),
    Str(String),
    Int(i64),
    Double(f64),
    List(Vec<Node>),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub value: Value,
    pub line: usize,
    pub column: usize,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Node {
    pub fn new(value: Value) -> Self {
        Self { value, line: 0, column: 0 }
    }

    pub fn atom(text: impl Into<String>) -> Self {
        Self::new(Value::Atom(text.into()))
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::new(Value::Str(text.into()))
    }

    pub fn int(v: i64) -> Self {
        Self::new(Value::Int(v))
    }

    pub fn double(v: f64) -> Self {
        Self::new(Value::Double(v))
    }

    /// `(head children...)`
    pub fn list(head: &str, children: Vec<Node>) -> Self {
        let mut items = Vec::with_capacity(children.len() + 1);
        items.push(Node::atom(head));
        items.extend(children);
        Self::new(Value::List(items))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.value, Value::List(_))
    }

    /// Children of a list; empty for scalars
    pub fn items(&self) -> &[Node] {
        match &self.value {
            Value::List(items) => items,
            _ => &[],
        }
    }

    /// Keyword at the head of a list, if it is an atom
    pub fn head(&self) -> Option<&str> {
        match self.items().first().map(|n| &n.value) {
            Some(Value::Atom(s)) => Some(s),
            _ => None,
        }
    }

    /// Items after the head keyword
    pub fn args(&self) -> &[Node] {
        let items = self.items();
        if items.is_empty() {
            items
        } else {
            &items[1..]
        }
    }

    /// First child list whose head matches `keyword`
    pub fn find(&self, keyword: &str) -> Option<&Node> {
        self.args().iter().find(|n| n.head() == Some(keyword))
    }

    /// All child lists whose head matches `keyword`
    pub fn find_all<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.args().iter().filter(move |n| n.head() == Some(keyword))
    }

    /// Text of an atom or a quoted string
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::Atom(s) | Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric value of an integer or double
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            Value::Int(v) => Some(v as f64),
            Value::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.value {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Total node count including self
    pub fn node_count(&self) -> usize {
        1 + self.items().iter().map(Node::node_count).sum::<usize>()
    }
}

/// Parse a complete document. The root must be a single list.
pub fn parse(text: &str) -> Result<Node, ParseError> {
    let _scope = NumericScope::enter();
    let mut lexer = Lexer::new(text);

    let first = lexer.next_token()?;
    match first.kind {
        TokenKind::Open => {}
        TokenKind::Eof => {
            return Err(ParseError::syntax(first.line, first.column, "empty document"));
        }
        _ => {
            return Err(ParseError::syntax(
                first.line,
                first.column,
                format!("expected '(' at start of document, found '{}'", first.text),
            ));
        }
    }

    let root = parse_list(&mut lexer, first)?;

    let trailing = lexer.next_token()?;
    if trailing.kind != TokenKind::Eof {
        return Err(ParseError::syntax(
            trailing.line,
            trailing.column,
            format!("unexpected '{}' after end of document", trailing.text),
        ));
    }
    log::debug!("parsed s-expression tree with {} nodes", root.node_count());
    Ok(root)
}

/// Build one list whose `(` has already been consumed. Nested lists are kept
/// on an explicit stack so deep documents cannot exhaust the call stack.
fn parse_list(lexer: &mut Lexer<'_>, open: Token) -> Result<Node, ParseError> {
    let mut stack: Vec<(Token, Vec<Node>)> = vec![(open, Vec::new())];

    loop {
        let tok = lexer.next_token()?;
        match tok.kind {
            TokenKind::Open => stack.push((tok, Vec::new())),
            TokenKind::Close => {
                let Some((open, items)) = stack.pop() else {
                    return Err(ParseError::syntax(tok.line, tok.column, "unexpected ')'"));
                };
                let node = Node { value: Value::List(items), line: open.line, column: open.column };
                match stack.last_mut() {
                    Some((_, parent)) => parent.push(node),
                    None => return Ok(node),
                }
            }
            TokenKind::Eof => {
                let (line, column) = stack.last().map(|(t, _)| (t.line, t.column)).unwrap_or((0, 0));
                return Err(ParseError::syntax(
                    tok.line,
                    tok.column,
                    format!(
                        "unexpected end of file: list opened at line {}, column {} is not closed",
                        line, column
                    ),
                ));
            }
            _ => {
                let node = scalar_node(tok)?;
                if let Some((_, items)) = stack.last_mut() {
                    items.push(node);
                }
            }
        }
    }
}

fn scalar_node(tok: Token) -> Result<Node, ParseError> {
    let value = match tok.kind {
        TokenKind::Int => match tok.text.parse::<i64>() {
            Ok(v) => Value::Int(v),
            Err(_) => {
                return Err(ParseError::syntax(
                    tok.line,
                    tok.column,
                    format!("integer literal '{}' out of range", tok.text),
                ));
            }
        },
        TokenKind::Double => match parse_double(&tok.text) {
            Some(v) => Value::Double(v),
            None => {
                return Err(ParseError::syntax(
                    tok.line,
                    tok.column,
                    format!("numeric literal '{}' out of range", tok.text),
                ));
            }
        },
        TokenKind::Str => Value::Str(tok.text),
        _ => Value::Atom(tok.text),
    };
    Ok(Node { value, line: tok.line, column: tok.column })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let root = parse("(kicad_pcb (version 20240108) (net 0 \"\"))").unwrap();
        assert_eq!(root.head(), Some("kicad_pcb"));
        assert_eq!(root.find("version").unwrap().args()[0].as_i64(), Some(20240108));
        let net = root.find("net").unwrap();
        assert_eq!(net.args()[1].as_str(), Some(""));
        assert_eq!(root.node_count(), 9);
    }

    #[test]
    fn test_whitespace_insensitive_equality() {
        let a = parse("(a (b 1 2.5) \"s\")").unwrap();
        let b = parse("(a\n\t(b   1\n 2.5)\n   \"s\"\n)\n").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unbalanced_close() {
        let err = parse("(a (b))\n)").unwrap_err();
        assert_eq!((err.line(), err.column()), (2, 1));
    }

    #[test]
    fn test_premature_eof() {
        let err = parse("(a\n (b 1)").unwrap_err();
        assert!(err.to_string().contains("not closed"), "{}", err);
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_integer_overflow_is_syntax_error() {
        let err = parse("(n 99999999999999999999)").unwrap_err();
        assert_eq!((err.line(), err.column()), (1, 4));
    }

    #[test]
    fn test_root_must_be_list() {
        assert!(parse("atom").is_err());
        assert!(parse("   ").is_err());
    }

    #[test]
    fn test_lex_error_propagates_coordinates() {
        let err = parse("(a\n  \"x\\z\")").unwrap_err();
        assert!(matches!(err, ParseError::Lex(_)));
        assert_eq!((err.line(), err.column()), (2, 5));
    }
}
