//! Deterministic S-expression output
//!
//! [`Formatter`] collects text in memory; callers decide where it goes.
//! Every emitted line is prefixed with `nest` copies of the indent unit and
//! a finished document always ends with exactly one newline.

use super::lexer::{classify_word, TokenKind};
use super::numeric::{format_iu, NumericScope};
use super::tree::{Node, Value};
use crate::config::FormatOptions;

/// Indent unit for one nesting level
pub const INDENT: &str = "  ";

/// Maximum line width used when packing short lists (e.g. `xy` points)
const WRAP_COLUMN: usize = 99;

/// Objects that can write themselves at a nesting level
pub trait FormatSexpr {
    fn format(&self, out: &mut Formatter, nest: usize);
}

pub struct Formatter {
    buf: String,
    indent: String,
    _scope: NumericScope,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self::with_options(&FormatOptions::default())
    }

    pub fn with_options(options: &FormatOptions) -> Self {
        Self {
            buf: String::with_capacity(4096),
            indent: options.indent.clone(),
            _scope: NumericScope::enter(),
        }
    }

    /// Write `text` on a new line at nesting level `nest`
    pub fn print(&mut self, nest: usize, text: &str) {
        if !self.buf.is_empty() && !self.buf.ends_with('\n') {
            self.buf.push('\n');
        }
        for _ in 0..nest {
            self.buf.push_str(&self.indent);
        }
        self.buf.push_str(text);
    }

    /// Append to the current line
    pub fn append(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    /// Write a run of short items, wrapping before `WRAP_COLUMN`
    pub fn print_wrapped(&mut self, nest: usize, items: &[String]) {
        let prefix = self.indent.len() * nest;
        let mut line_len = 0;
        for (i, item) in items.iter().enumerate() {
            if i == 0 || line_len + 1 + item.len() > WRAP_COLUMN {
                self.print(nest, item);
                line_len = prefix + item.len();
            } else {
                self.buf.push(' ');
                self.buf.push_str(item);
                line_len += 1 + item.len();
            }
        }
    }

    /// Finish the document with exactly one trailing newline
    pub fn finish(mut self) -> String {
        let trimmed = self.buf.trim_end_matches('\n').len();
        self.buf.truncate(trimmed);
        self.buf.push('\n');
        std::mem::take(&mut self.buf)
    }
}

/// Quote and escape a string
pub fn quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `(keyword "value")`
pub fn quoted_field(keyword: &str, value: &str) -> String {
    format!("({} {})", keyword, quoted(value))
}

/// `(keyword x y)` with both values in millimetres
pub fn xy_field(keyword: &str, x: i64, y: i64) -> String {
    format!("({} {} {})", keyword, format_iu(x), format_iu(y))
}

/// Text form of a scalar node
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Atom(s) => s.clone(),
        Value::Str(s) => quoted(s),
        Value::Int(v) => v.to_string(),
        Value::Double(v) => double_text(*v),
        Value::List(_) => String::new(),
    }
}

/// Shortest text that reads back as the same double, never as an integer
fn double_text(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0.0".to_string();
    }
    let magnitude = value.abs();
    let text = if (1e-5..1e15).contains(&magnitude) {
        format!("{}", value)
    } else {
        format!("{:e}", value)
    };
    if classify_word(&text) == TokenKind::Int {
        text + ".0"
    } else {
        text
    }
}

/// Single-line rendering of a node
pub fn inline_text(node: &Node) -> String {
    match &node.value {
        Value::List(items) => {
            let parts: Vec<String> = items.iter().map(inline_text).collect();
            format!("({})", parts.join(" "))
        }
        other => scalar_text(other),
    }
}

impl Node {
    /// Canonical text for a generic tree. Lists holding only scalars stay on
    /// one line; lists with nested lists put each nested list on its own line
    /// and close on a line of their own. A scalar never starts a line.
    pub fn to_sexpr_string(&self) -> String {
        self.to_sexpr_string_with(&FormatOptions::default())
    }

    pub fn to_sexpr_string_with(&self, options: &FormatOptions) -> String {
        let mut out = Formatter::with_options(options);
        write_node(&mut out, self, 0);
        out.finish()
    }
}

fn write_node(out: &mut Formatter, node: &Node, nest: usize) {
    let items = match &node.value {
        Value::List(items) => items,
        other => {
            out.print(nest, &scalar_text(other));
            return;
        }
    };

    if items.iter().all(|n| !n.is_list()) {
        out.print(nest, &inline_text(node));
        return;
    }

    // leading scalars share the opening line
    let split = items.iter().position(Node::is_list).unwrap_or(items.len());
    let lead: Vec<String> = items[..split].iter().map(|n| scalar_text(&n.value)).collect();
    out.print(nest, &format!("({}", lead.join(" ")));
    for child in &items[split..] {
        if child.is_list() {
            write_node(out, child, nest + 1);
        } else {
            // a line-leading `#` would read back as a comment
            out.append(" ");
            out.append(&scalar_text(&child.value));
        }
    }
    out.print(nest, ")");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sexpr::parse;

    #[test]
    fn test_quoting() {
        assert_eq!(quoted("a\"b"), r#""a\"b""#);
        assert_eq!(quoted("x\\y\nz"), r#""x\\y\nz""#);
    }

    #[test]
    fn test_generic_tree_layout() {
        let root = parse("(kicad_pcb (version 7) (general (thickness 1.6)) (net 0 \"\"))").unwrap();
        let text = root.to_sexpr_string();
        assert_eq!(
            text,
            "(kicad_pcb\n  (version 7)\n  (general\n    (thickness 1.6)\n  )\n  (net 0 \"\")\n)\n"
        );
    }

    #[test]
    fn test_generic_tree_idempotent() {
        let src = "(a b \"c d\" (e 1.250 -0.0) (f (g h) 2) 3)";
        let once = parse(src).unwrap().to_sexpr_string();
        let twice = parse(&once).unwrap().to_sexpr_string();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_doubles_stay_doubles() {
        let root = parse("(a (x 1.0) (y -0.0) (z 1e300) (w 0.1) (v -2.5e-9))").unwrap();
        let text = root.to_sexpr_string();
        assert_eq!(
            text,
            "(a\n  (x 1.0)\n  (y 0.0)\n  (z 1e300)\n  (w 0.1)\n  (v -2.5e-9)\n)\n"
        );
        assert_eq!(parse(&text).unwrap(), root);
    }

    #[test]
    fn test_trailing_scalars_follow_a_list() {
        let root = parse("(a (b) #x 3 (c) \"s\")").unwrap();
        let text = root.to_sexpr_string();
        assert_eq!(text, "(a\n  (b) #x 3\n  (c) \"s\"\n)\n");
        assert_eq!(parse(&text).unwrap(), root);
    }

    #[test]
    fn test_indent_option() {
        let root = parse("(a (b 1))").unwrap();
        let options = FormatOptions { indent: "\t".to_string() };
        assert_eq!(root.to_sexpr_string_with(&options), "(a\n\t(b 1)\n)\n");
    }

    #[test]
    fn test_finish_single_newline() {
        let mut out = Formatter::new();
        out.print(0, "(a)");
        out.append("\n\n");
        assert_eq!(out.finish(), "(a)\n");
    }

    #[test]
    fn test_wrapped_items() {
        let mut out = Formatter::new();
        let items: Vec<String> = (0..30).map(|i| format!("(xy {} {})", i, i)).collect();
        out.print_wrapped(1, &items);
        let text = out.finish();
        assert!(text.lines().count() > 1);
        assert!(text.lines().all(|l| l.len() <= 99 && l.starts_with("  (xy")));
    }
}
