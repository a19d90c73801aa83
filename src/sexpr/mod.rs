//! S-expression file format: lexer, tree, numbers and output
//!
//! # Submodules
//! - `lexer` - Tokens with line/column positions
//! - `tree` - Parse tree and the document parser
//! - `numeric` - Locale independent number text
//! - `writer` - Deterministic output formatter

mod lexer;
mod numeric;
mod tree;
mod writer;

pub use lexer::{classify_word, Lexer, Token, TokenKind};

pub use tree::{parse, Node, Value};

pub use numeric::{format_double, format_fixed, format_iu, parse_double, NumericScope, IU_PER_MM};

pub use writer::{inline_text, quoted, quoted_field, xy_field, FormatSexpr, Formatter, INDENT};
