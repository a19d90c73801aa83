//! Library table documents
//!
//! A table lists libraries by nickname. Rows keep the order they were read
//! in, and a nickname may appear only once per table.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::FormatOptions;
use crate::error::{LibTableError, ParseError};
use crate::report::{emit, Reporter, Severity};
use crate::sexpr::{self, inline_text, quoted, FormatSexpr, Formatter, Node, NumericScope};

/// Row type naming another table file instead of a library
pub const TABLE_ROW_TYPE: &str = "Table";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LibTableKind {
    Symbol,
    Footprint,
    DesignBlock,
}

impl LibTableKind {
    pub fn root_keyword(self) -> &'static str {
        match self {
            LibTableKind::Symbol => "sym_lib_table",
            LibTableKind::Footprint => "fp_lib_table",
            LibTableKind::DesignBlock => "design_block_lib_table",
        }
    }

    pub fn from_root_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "sym_lib_table" => Some(LibTableKind::Symbol),
            "fp_lib_table" => Some(LibTableKind::Footprint),
            "design_block_lib_table" => Some(LibTableKind::DesignBlock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LibTableRow {
    pub nickname: String,
    pub lib_type: String,
    pub uri: String,
    pub options: String,
    pub description: String,
    pub disabled: bool,
    pub hidden: bool,
    /// Written as `nested_table` rather than `lib`
    pub nested: bool,
}

impl LibTableRow {
    pub fn new(nickname: impl Into<String>, lib_type: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            lib_type: lib_type.into(),
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Whether the URI names another table whose rows belong to this one
    pub fn is_table(&self) -> bool {
        self.nested || self.lib_type == TABLE_ROW_TYPE
    }
}

impl FormatSexpr for LibTableRow {
    fn format(&self, out: &mut Formatter, nest: usize) {
        let mut line = if self.nested {
            format!(
                "(nested_table (name {})(uri {})(options {})(descr {})",
                quoted(&self.nickname),
                quoted(&self.uri),
                quoted(&self.options),
                quoted(&self.description)
            )
        } else {
            format!(
                "(lib (name {})(type {})(uri {})(options {})(descr {})",
                quoted(&self.nickname),
                quoted(&self.lib_type),
                quoted(&self.uri),
                quoted(&self.options),
                quoted(&self.description)
            )
        };
        if self.disabled {
            line.push_str("(disabled)");
        }
        if self.hidden {
            line.push_str("(hidden)");
        }
        line.push(')');
        out.print(nest, &line);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibTable {
    pub kind: LibTableKind,
    pub version: Option<i64>,
    pub rows: IndexMap<String, LibTableRow>,
}

impl LibTable {
    pub fn new(kind: LibTableKind) -> Self {
        Self { kind, version: None, rows: IndexMap::new() }
    }

    /// Add a row; nicknames are unique within a table
    pub fn insert(&mut self, row: LibTableRow) -> Result<(), LibTableError> {
        if self.rows.contains_key(&row.nickname) {
            return Err(LibTableError::DuplicateNickname(row.nickname));
        }
        self.rows.insert(row.nickname.clone(), row);
        Ok(())
    }

    pub fn get(&self, nickname: &str) -> Option<&LibTableRow> {
        self.rows.get(nickname)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows that name libraries, skipping nested table references
    pub fn libraries(&self) -> impl Iterator<Item = &LibTableRow> {
        self.rows.values().filter(|r| !r.is_table())
    }

    /// Parse table text. Malformed rows are reported and skipped.
    pub fn parse(text: &str, reporter: Option<&mut dyn Reporter>) -> Result<LibTable, LibTableError> {
        let _scope = NumericScope::enter();
        let root = sexpr::parse(text)?;
        let mut reporter = reporter;
        table_from_tree(&root, &mut reporter)
    }

    pub fn to_sexpr_string(&self, options: &FormatOptions) -> String {
        let mut out = Formatter::with_options(options);
        self.format(&mut out, 0);
        out.finish()
    }
}

impl FormatSexpr for LibTable {
    fn format(&self, out: &mut Formatter, nest: usize) {
        out.print(nest, &format!("({}", self.kind.root_keyword()));
        if let Some(version) = self.version {
            out.print(nest + 1, &format!("(version {})", version));
        }
        for row in self.rows.values() {
            row.format(out, nest + 1);
        }
        out.print(nest, ")");
    }
}

fn syntax(node: &Node, message: impl Into<String>) -> ParseError {
    ParseError::syntax(node.line, node.column, message)
}

fn single_string(node: &Node) -> Option<String> {
    match node.args() {
        [value] => value.as_str().map(str::to_string),
        _ => None,
    }
}

/// Build a row from a `lib` or `nested_table` list
fn parse_row(node: &Node) -> Result<LibTableRow, LibTableError> {
    let nested = node.head() == Some("nested_table");
    let mut row = LibTableRow { nested, ..LibTableRow::default() };
    let nickname = node
        .find("name")
        .and_then(single_string)
        .unwrap_or_else(|| format!("<unnamed row at line {}>", node.line));
    let row_error = |message: String| LibTableError::Row { nickname: nickname.clone(), message };

    let mut has_name = false;
    let mut has_type = nested;
    let mut has_uri = false;
    for field in node.args() {
        let keyword = field
            .head()
            .ok_or_else(|| row_error(format!("unexpected '{}'", inline_text(field))))?;
        match keyword {
            "disabled" | "hidden" => {
                if !field.args().is_empty() {
                    return Err(row_error(format!("'{}' takes no value", keyword)));
                }
                if keyword == "disabled" {
                    row.disabled = true;
                } else {
                    row.hidden = true;
                }
            }
            "name" | "type" | "uri" | "options" | "descr" => {
                let value =
                    single_string(field).ok_or_else(|| row_error(format!("'{}' expects one value", keyword)))?;
                match keyword {
                    "name" => {
                        row.nickname = value;
                        has_name = true;
                    }
                    "type" if !nested => {
                        row.lib_type = value;
                        has_type = true;
                    }
                    "type" => return Err(row_error("'type' is not allowed in a nested table row".into())),
                    "uri" => {
                        row.uri = value;
                        has_uri = true;
                    }
                    "options" => row.options = value,
                    _ => row.description = value,
                }
            }
            other => return Err(row_error(format!("unknown keyword '{}'", other))),
        }
    }

    for (present, field) in [(has_name, "name"), (has_type, "type"), (has_uri, "uri")] {
        if !present {
            return Err(row_error(format!("missing required field '{}'", field)));
        }
    }
    if nested {
        row.lib_type = TABLE_ROW_TYPE.to_string();
    }
    Ok(row)
}

/// Build a table from a parsed tree
pub fn table_from_tree(root: &Node, reporter: &mut Option<&mut dyn Reporter>) -> Result<LibTable, LibTableError> {
    let head = root.head().unwrap_or_default();
    let kind = LibTableKind::from_root_keyword(head)
        .ok_or_else(|| syntax(root, format!("expected a library table, found '{}'", head)))?;
    let mut table = LibTable::new(kind);

    for child in root.args() {
        match child.head() {
            Some("version") => match child.args() {
                [v] => table.version = Some(v.as_i64().ok_or_else(|| syntax(v, "expected an integer version"))?),
                _ => return Err(syntax(child, "'version' expects one value").into()),
            },
            Some("lib") | Some("nested_table") => match parse_row(child) {
                Ok(row) => table.insert(row)?,
                Err(err @ LibTableError::Row { .. }) => {
                    log::warn!("line {}: {}", child.line, err);
                    emit(reporter, &format!("line {}: {}", child.line, err), Severity::Warning);
                }
                Err(err) => return Err(err),
            },
            _ => {
                let message = format!("line {}: skipped unknown '{}' in library table", child.line, inline_text(child));
                log::debug!("{}", message);
                emit(reporter, &message, Severity::Warning);
            }
        }
    }

    log::debug!("parsed {} with {} rows", kind.root_keyword(), table.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportCollector;

    const DEVICE_TABLE: &str = "(sym_lib_table\n  (lib (name \"Device\")(type \"KiCad\")(uri \"${KICAD_SYMBOL_DIR}/Device.kicad_sym\")(options \"\")(descr \"Device symbols\"))\n)\n";

    #[test]
    fn test_parse_device_row() {
        let table = LibTable::parse(DEVICE_TABLE, None).unwrap();
        assert_eq!(table.kind, LibTableKind::Symbol);
        let row = table.get("Device").unwrap();
        assert_eq!(row.lib_type, "KiCad");
        assert_eq!(row.uri, "${KICAD_SYMBOL_DIR}/Device.kicad_sym");
        assert_eq!(row.description, "Device symbols");
        assert!(!row.is_table());
    }

    #[test]
    fn test_format_is_byte_identical() {
        let table = LibTable::parse(DEVICE_TABLE, None).unwrap();
        assert_eq!(table.to_sexpr_string(&FormatOptions::default()), DEVICE_TABLE);
    }

    #[test]
    fn test_flags_and_nested_rows() {
        let text = "(fp_lib_table\n  (version 7)\n  (lib (name \"A\")(type \"KiCad\")(uri \"a.pretty\")(options \"\")(descr \"\")(disabled)(hidden))\n  (nested_table (name \"More\")(uri \"more.tbl\")(options \"\")(descr \"\"))\n)\n";
        let table = LibTable::parse(text, None).unwrap();
        assert_eq!(table.version, Some(7));
        let a = table.get("A").unwrap();
        assert!(a.disabled && a.hidden);
        assert!(table.get("More").unwrap().is_table());
        assert_eq!(table.libraries().count(), 1);
        assert_eq!(table.to_sexpr_string(&FormatOptions::default()), text);
    }

    #[test]
    fn test_malformed_row_is_reported_and_skipped() {
        let text = "(sym_lib_table (lib (name \"Bad\")(type \"KiCad\")) (lib (name \"Good\")(type \"KiCad\")(uri \"g\")))";
        let mut collector = ReportCollector::new();
        let table = LibTable::parse(text, Some(&mut collector)).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("Good").is_some());
        let warnings: Vec<&str> = collector.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("'Bad'") && warnings[0].contains("'uri'"), "{}", warnings[0]);
    }

    #[test]
    fn test_duplicate_nickname() {
        let text = "(sym_lib_table (lib (name \"X\")(type \"KiCad\")(uri \"1\")) (lib (name \"X\")(type \"KiCad\")(uri \"2\")))";
        match LibTable::parse(text, None) {
            Err(LibTableError::DuplicateNickname(name)) => assert_eq!(name, "X"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wrong_root() {
        let err = LibTable::parse("(kicad_pcb (version 1))", None).unwrap_err();
        assert!(matches!(err, LibTableError::Syntax(_)));
    }
}
