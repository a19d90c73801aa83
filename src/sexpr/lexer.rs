//! Tokenizer for the S-expression file format
//!
//! Produces tokens lazily from an in-memory string. Line comments start with
//! `#` as the first non-blank character of a line.

use crate::error::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Open,
    Close,
    Atom,
    /// Quoted string, `text` holds the unescaped content
    Str,
    Int,
    Double,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    at_line_start: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            src: text.as_bytes(),
            text,
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
        }
    }

    /// Current position as (line, column)
    pub fn location(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.src.get(self.pos).copied()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else if b & 0xC0 != 0x80 {
            // count characters, not UTF-8 continuation bytes
            self.column += 1;
        }
        Some(b)
    }

    fn skip_blank(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                b'#' if self.at_line_start => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    /// Produce the next token. After the input is exhausted every call
    /// returns an `Eof` token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_blank();
        self.at_line_start = false;
        let (line, column) = self.location();

        let b = match self.peek() {
            Some(b) => b,
            None => {
                return Ok(Token { kind: TokenKind::Eof, text: String::new(), line, column });
            }
        };

        match b {
            b'(' => {
                self.bump();
                Ok(Token { kind: TokenKind::Open, text: "(".to_string(), line, column })
            }
            b')' => {
                self.bump();
                Ok(Token { kind: TokenKind::Close, text: ")".to_string(), line, column })
            }
            b'"' => self.read_string(line, column),
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    self.bump();
                }
                // delimiters are ASCII so `start..pos` is on char boundaries
                let word = &self.text[start..self.pos];
                Ok(Token { kind: classify_word(word), text: word.to_string(), line, column })
            }
        }
    }

    fn read_string(&mut self, line: usize, column: usize) -> Result<Token, LexError> {
        self.bump(); // opening quote
        let mut content: Vec<u8> = Vec::new();
        loop {
            let (esc_line, esc_column) = self.location();
            match self.bump() {
                None => return Err(LexError::UnterminatedString { line, column }),
                Some(b'"') => break,
                Some(b'\\') => {
                    let escaped = match self.bump() {
                        None => return Err(LexError::UnterminatedString { line, column }),
                        Some(b'"') => b'"',
                        Some(b'\\') => b'\\',
                        Some(b'n') => b'\n',
                        Some(b'r') => b'\r',
                        Some(b't') => b'\t',
                        Some(other) => {
                            let escape = self.char_before(other);
                            return Err(LexError::InvalidEscape { escape, line: esc_line, column: esc_column });
                        }
                    };
                    content.push(escaped);
                }
                Some(other) => content.push(other),
            }
        }
        // input was a &str and escapes are ASCII, so this stays valid UTF-8
        let text = String::from_utf8_lossy(&content).into_owned();
        Ok(Token { kind: TokenKind::Str, text, line, column })
    }

    /// Decode the (possibly multi-byte) character whose first byte was just consumed
    fn char_before(&self, first: u8) -> char {
        if first.is_ascii() {
            return first as char;
        }
        self.text[self.pos - 1..].chars().next().unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    /// Yields tokens up to, but not including, `Eof`
    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(tok) if tok.kind == TokenKind::Eof => None,
            other => Some(other),
        }
    }
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'"' | b' ' | b'\t' | b'\r' | b'\n')
}

/// Decide whether a bare word is an integer, a double or a plain atom
pub fn classify_word(word: &str) -> TokenKind {
    let bytes = word.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i = 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;
    if i == bytes.len() {
        return if int_digits > 0 { TokenKind::Int } else { TokenKind::Atom };
    }

    let mut frac_digits = 0;
    let mut is_double = false;
    if bytes[i] == b'.' {
        is_double = true;
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }
    if int_digits + frac_digits == 0 {
        return TokenKind::Atom;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        is_double = true;
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return TokenKind::Atom;
        }
    }

    if is_double && i == bytes.len() {
        TokenKind::Double
    } else {
        TokenKind::Atom
    }
}
