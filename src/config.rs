//! Tunables for parsing, formatting and polygon processing.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Arc approximation error used when none is given, in IU (0.005 mm)
pub const DEFAULT_MAX_ERROR: i64 = 5_000;

/// Fraction of `i32::MAX` that parsed coordinates are clamped to.
/// 1/sqrt(2) keeps the extent of a 45 degree rotated box representable.
pub const DEFAULT_CLAMP_FACTOR: f64 = 0.7071;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub clamp_factor: f64,
    /// Report skipped keywords in extensible objects
    pub warn_on_unknown: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            clamp_factor: DEFAULT_CLAMP_FACTOR,
            warn_on_unknown: true,
        }
    }
}

impl ParseOptions {
    /// Largest magnitude a parsed length may take, in IU
    pub fn coordinate_limit(&self) -> f64 {
        i32::MAX as f64 * self.clamp_factor
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatOptions {
    pub indent: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: crate::sexpr::INDENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryOptions {
    /// Maximum deviation of arc/circle approximations, in IU
    pub max_error: i64,
    /// Upper bound on edge-splitting passes in the boolean engine
    pub max_split_passes: usize,
}

impl Default for GeometryOptions {
    fn default() -> Self {
        Self {
            max_error: DEFAULT_MAX_ERROR,
            max_split_passes: 8,
        }
    }
}

/// All options in one document, as stored on disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub parse: ParseOptions,
    pub format: FormatOptions,
    pub geometry: GeometryOptions,
}

impl KernelConfig {
    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.as_ref().display(), e))?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg = KernelConfig::from_json_str(r#"{ "parse": { "clamp_factor": 0.5 } }"#).unwrap();
        assert_eq!(cfg.parse.clamp_factor, 0.5);
        assert!(cfg.parse.warn_on_unknown);
        assert_eq!(cfg.geometry, GeometryOptions::default());
        assert_eq!(cfg.format.indent, "  ");
    }

    #[test]
    fn test_coordinate_limit() {
        let opts = ParseOptions::default();
        assert_eq!(opts.coordinate_limit(), i32::MAX as f64 * 0.7071);
    }
}
