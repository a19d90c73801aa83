//! Polygon geometry and S-expression file kernel for PCB data
//!
//! # Modules
//! - `sexpr` - Lexer, tree, locale independent numbers and the formatter
//! - `board` - Board objects with their parser and canonical output
//! - `libtable` - Symbol, footprint and design block library tables
//! - `geometry` - Polygon sets, boolean algebra, offsetting and fracturing
//! - `config` - Parse, format and geometry options
//! - `report` - Warning and progress sinks
//! - `error` - Error types

pub mod board;
pub mod config;
pub mod error;
pub mod geometry;
pub mod libtable;
pub mod report;
pub mod sexpr;

use std::path::Path;

use anyhow::Context;

pub use board::{format_board, parse_board, Board};
pub use config::{FormatOptions, GeometryOptions, KernelConfig, ParseOptions};
pub use error::{GeometryError, LexError, LibTableError, ParseError};
pub use geometry::{BooleanOp, Outline, Point, Polygon, PolygonSet};
pub use libtable::{LibTable, LibTableLoader};
pub use report::{LogReporter, ProgressReporter, ReportCollector, Reporter, Severity};

/// Read and parse a board file, forwarding warnings to `reporter`
pub fn load_board_file<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
    reporter: Option<&mut dyn Reporter>,
) -> anyhow::Result<Board> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let board = parse_board(&text, options, reporter, None).with_context(|| format!("failed to parse {}", path.display()))?;
    log::info!("loaded {}: {} zones", path.display(), board.zones.len());
    Ok(board)
}
