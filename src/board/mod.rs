//! Board documents: domain objects, grammar-driven parser and formatter
//!
//! # Submodules
//! - `types` - Board, footprints, pads, drawings and zones
//! - `parser` - Keyword tables and per-object parse routines
//! - `format` - Canonical board text

mod format;
mod parser;
mod types;

pub use types::{At, Board, Drawing, Drill, Footprint, Layer, Net, Pad, Property, Shape, Stroke, TitleBlock, Zone, ZoneFill};

pub use parser::{board_from_tree, board_units, parse_board, FieldSpec, Schema};

pub use format::format_board;
