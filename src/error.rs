//! Error types for lexing, parsing, geometry and library tables.
//!
//! Out-of-range numbers are deliberately absent here: they are clamped and
//! reported through a [`crate::report::Reporter`] rather than failing.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed token stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A quoted string ran into the end of input.
    #[error("unterminated string starting at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },

    /// A backslash followed by a character that has no escape meaning.
    #[error("invalid escape sequence '\\{escape}' at line {line}, column {column}")]
    InvalidEscape { escape: char, line: usize, column: usize },
}

impl LexError {
    pub fn line(&self) -> usize {
        match self {
            LexError::UnterminatedString { line, .. } | LexError::InvalidEscape { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            LexError::UnterminatedString { column, .. } | LexError::InvalidEscape { column, .. } => *column,
        }
    }
}

/// Structural or grammar error found while reading a document.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}

impl ParseError {
    pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self {
        ParseError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    /// Source line of the offending token (1-based).
    pub fn line(&self) -> usize {
        match self {
            ParseError::Lex(e) => e.line(),
            ParseError::Syntax { line, .. } => *line,
        }
    }

    /// Source column of the offending token (1-based).
    pub fn column(&self) -> usize {
        match self {
            ParseError::Lex(e) => e.column(),
            ParseError::Syntax { column, .. } => *column,
        }
    }
}

/// Geometry that cannot be transformed into the requested form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// No hole of the polygon could be connected to the outline without
    /// crossing an edge.
    #[error("polygon {polygon}: hole {hole} has no valid slit to the outline")]
    Unfracturable { polygon: usize, hole: usize },

    /// An outline or hole with fewer than three vertices.
    #[error("polygon {polygon}: outline has only {vertices} vertices")]
    DegenerateOutline { polygon: usize, vertices: usize },
}

/// Failures while loading library tables.
#[derive(Error, Debug)]
pub enum LibTableError {
    #[error("failed to read library table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("library table {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// Table text that is not a valid library table document.
    #[error(transparent)]
    Syntax(#[from] ParseError),

    /// The nested table chain leads back to a table that is still loading.
    #[error("library table cycle: {}", format_chain(.chain))]
    Cycle { chain: Vec<PathBuf> },

    #[error("duplicate library nickname '{0}'")]
    DuplicateNickname(String),

    #[error("library '{nickname}': {message}")]
    Row { nickname: String, message: String },
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_coordinates() {
        let err: ParseError = LexError::InvalidEscape { escape: 'q', line: 3, column: 7 }.into();
        assert_eq!(err.line(), 3);
        assert_eq!(err.column(), 7);

        let err = ParseError::syntax(12, 4, "unexpected ')'");
        assert_eq!(err.to_string(), "syntax error at line 12, column 4: unexpected ')'");
    }

    #[test]
    fn test_cycle_message_lists_chain() {
        let err = LibTableError::Cycle {
            chain: vec![PathBuf::from("a.tbl"), PathBuf::from("b.tbl"), PathBuf::from("a.tbl")],
        };
        assert_eq!(err.to_string(), "library table cycle: a.tbl -> b.tbl -> a.tbl");
    }
}
