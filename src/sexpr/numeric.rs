//! Locale-independent number text conversion
//!
//! Rust's float formatting and parsing never look at the C runtime locale,
//! so `.` is always the decimal separator. [`NumericScope`] marks the
//! parse/format entry points and keeps a per-thread nesting depth; it never
//! touches process-wide state.

use std::cell::Cell;

/// Internal units per millimetre (1 IU = 1 nm)
pub const IU_PER_MM: f64 = 1e6;

const IU_PER_MM_INT: i64 = 1_000_000;

thread_local! {
    static SCOPE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// RAII marker held for the duration of every parse and format call
#[derive(Debug)]
pub struct NumericScope {
    _private: (),
}

impl NumericScope {
    pub fn enter() -> Self {
        let prev = SCOPE_DEPTH.with(|d| {
            let prev = d.get();
            d.set(prev + 1);
            prev
        });
        if prev == 0 {
            log::trace!("numeric scope opened");
        }
        Self { _private: () }
    }

    /// Nesting depth of scopes on the current thread
    pub fn depth() -> usize {
        SCOPE_DEPTH.with(|d| d.get())
    }
}

impl Drop for NumericScope {
    fn drop(&mut self) {
        let now = SCOPE_DEPTH.with(|d| {
            let now = d.get().saturating_sub(1);
            d.set(now);
            now
        });
        if now == 0 {
            log::trace!("numeric scope closed");
        }
    }
}

/// Format a length in IU as millimetres. Exact: no floating point involved.
pub fn format_iu(iu: i64) -> String {
    let negative = iu < 0;
    let abs = iu.unsigned_abs();
    let whole = abs / IU_PER_MM_INT as u64;
    let frac = abs % IU_PER_MM_INT as u64;

    let mut text = if negative { String::from("-") } else { String::new() };
    text.push_str(&whole.to_string());
    if frac != 0 {
        let digits = format!("{:06}", frac);
        text.push('.');
        text.push_str(digits.trim_end_matches('0'));
    }
    text
}

/// Format a double with at most 10 decimals, trailing zeros trimmed.
/// Never produces `-0`.
pub fn format_double(value: f64) -> String {
    format_fixed(value, 10)
}

/// Fixed precision with trailing zeros trimmed
pub fn format_fixed(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let mut text = format!("{:.*}", decimals, value);
    if text.contains('.') {
        let trimmed_len = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed_len);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

/// Parse a decimal number the way the lexer classifies it
pub fn parse_double(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}
