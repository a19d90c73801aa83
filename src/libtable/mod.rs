//! Library tables: symbol, footprint and design block library lists
//!
//! # Submodules
//! - `table` - Table rows, parsing and canonical output
//! - `loader` - Loading from storage with nested tables and `${VAR}` URIs

mod loader;
mod table;

pub use table::{table_from_tree, LibTable, LibTableKind, LibTableRow, TABLE_ROW_TYPE};

pub use loader::{expand_vars, FsSource, LibTableLoader, TableSource};
