//! Loading library tables from storage
//!
//! Nested table rows are replaced by the rows of the table they name, so a
//! loaded table is flat. Relative nested URIs resolve against the directory
//! of the table that names them.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use super::table::{table_from_tree, LibTable};
use crate::error::LibTableError;
use crate::report::{emit, Reporter, Severity};
use crate::sexpr::{self, NumericScope};

/// Where table text comes from
pub trait TableSource {
    fn read_table(&self, path: &Path) -> std::io::Result<String>;
}

/// Reads tables from the file system
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSource;

impl TableSource for FsSource {
    fn read_table(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Replace `${NAME}` references from `env`. Unknown names are left in place
/// and reported.
pub fn expand_vars(text: &str, env: &BTreeMap<String, String>, reporter: &mut Option<&mut dyn Reporter>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match env.get(name) {
            Some(value) => out.push_str(value),
            None => {
                emit(reporter, &format!("undefined variable '{}' in '{}'", name, text), Severity::Warning);
                out.push_str(&rest[start..start + 3 + end]);
            }
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// `path` with `.` removed and `..` applied, without touching the disk
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Loads a table and every table nested below it
pub struct LibTableLoader<S = FsSource> {
    source: S,
    env: BTreeMap<String, String>,
}

impl LibTableLoader<FsSource> {
    pub fn new() -> Self {
        Self::with_source(FsSource)
    }
}

impl Default for LibTableLoader<FsSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TableSource> LibTableLoader<S> {
    pub fn with_source(source: S) -> Self {
        Self { source, env: BTreeMap::new() }
    }

    /// Variables used for `${NAME}` substitution in URIs
    pub fn with_env<K: Into<String>, V: Into<String>>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self {
        self.env.extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.insert(name.into(), value.into());
    }

    /// Load the table at `path` with nested tables merged in
    pub fn load(&self, path: &Path, reporter: Option<&mut dyn Reporter>) -> Result<LibTable, LibTableError> {
        let mut reporter = reporter;
        let mut loading = Vec::new();
        let table = self.load_nested(path, &mut loading, &mut reporter)?;
        log::debug!("loaded library table {} with {} rows", path.display(), table.len());
        Ok(table)
    }

    fn load_nested(
        &self,
        path: &Path,
        loading: &mut Vec<PathBuf>,
        reporter: &mut Option<&mut dyn Reporter>,
    ) -> Result<LibTable, LibTableError> {
        let key = normalize(path);
        if let Some(pos) = loading.iter().position(|p| *p == key) {
            let mut chain = loading[pos..].to_vec();
            chain.push(key);
            return Err(LibTableError::Cycle { chain });
        }

        let text = self
            .source
            .read_table(path)
            .map_err(|source| LibTableError::Io { path: path.to_path_buf(), source })?;
        let root = {
            let _scope = NumericScope::enter();
            sexpr::parse(&text)
        }
        .map_err(|source| LibTableError::Parse { path: path.to_path_buf(), source })?;
        let parsed = table_from_tree(&root, reporter).map_err(|err| match err {
            LibTableError::Syntax(source) => LibTableError::Parse { path: path.to_path_buf(), source },
            other => other,
        })?;

        loading.push(key);
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let mut table = LibTable::new(parsed.kind);
        table.version = parsed.version;

        for (_, mut row) in parsed.rows {
            row.uri = expand_vars(&row.uri, &self.env, reporter);
            if !row.is_table() {
                table.insert(row)?;
                continue;
            }
            if row.disabled {
                log::debug!("skipping disabled nested table '{}'", row.nickname);
                continue;
            }

            let child_path = base.join(&row.uri);
            log::trace!("loading nested table '{}' from {}", row.nickname, child_path.display());
            let child = self.load_nested(&child_path, loading, reporter)?;
            if child.kind != table.kind {
                emit(
                    reporter,
                    &format!(
                        "nested table '{}' is a {} inside a {}",
                        row.nickname,
                        child.kind.root_keyword(),
                        table.kind.root_keyword()
                    ),
                    Severity::Warning,
                );
            }
            for (_, nested_row) in child.rows {
                table.insert(nested_row)?;
            }
        }

        loading.pop();
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportCollector;
    use std::collections::HashMap;

    struct MemorySource(HashMap<PathBuf, String>);

    impl MemorySource {
        fn new(files: &[(&str, &str)]) -> Self {
            Self(files.iter().map(|(p, t)| (PathBuf::from(p), t.to_string())).collect())
        }
    }

    impl TableSource for MemorySource {
        fn read_table(&self, path: &Path) -> std::io::Result<String> {
            self.0
                .get(&normalize(path))
                .cloned()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, path.display().to_string()))
        }
    }

    #[test]
    fn test_expand_vars() {
        let env: BTreeMap<String, String> = [("LIBS".to_string(), "/usr/share".to_string())].into_iter().collect();
        let mut collector = ReportCollector::new();
        let mut reporter: Option<&mut dyn Reporter> = Some(&mut collector);
        assert_eq!(expand_vars("${LIBS}/Device.kicad_sym", &env, &mut reporter), "/usr/share/Device.kicad_sym");
        assert_eq!(expand_vars("${NOPE}/x", &env, &mut reporter), "${NOPE}/x");
        assert_eq!(expand_vars("${open", &env, &mut reporter), "${open");
        assert_eq!(collector.warnings().count(), 1);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c.tbl")), PathBuf::from("/a/c.tbl"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_nested_rows_are_merged() {
        let source = MemorySource::new(&[
            (
                "/t/root.tbl",
                "(fp_lib_table (lib (name \"A\")(type \"KiCad\")(uri \"${LIB}/a.pretty\")) (nested_table (name \"sub\")(uri \"sub/inner.tbl\")))",
            ),
            ("/t/sub/inner.tbl", "(fp_lib_table (lib (name \"B\")(type \"KiCad\")(uri \"b.pretty\")))"),
        ]);
        let table = LibTableLoader::with_source(source)
            .with_env([("LIB", "/libs")])
            .load(Path::new("/t/root.tbl"), None)
            .unwrap();
        let names: Vec<&str> = table.rows.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(table.get("A").unwrap().uri, "/libs/a.pretty");
    }

    #[test]
    fn test_cycle_is_detected() {
        let source = MemorySource::new(&[
            ("/t/a.tbl", "(sym_lib_table (lib (name \"toB\")(type \"Table\")(uri \"b.tbl\")))"),
            ("/t/b.tbl", "(sym_lib_table (nested_table (name \"toA\")(uri \"./a.tbl\")))"),
        ]);
        let err = LibTableLoader::with_source(source).load(Path::new("/t/a.tbl"), None).unwrap_err();
        match err {
            LibTableError::Cycle { chain } => assert_eq!(
                chain,
                vec![PathBuf::from("/t/a.tbl"), PathBuf::from("/t/b.tbl"), PathBuf::from("/t/a.tbl")]
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_across_nested_tables() {
        let source = MemorySource::new(&[
            ("/a.tbl", "(sym_lib_table (lib (name \"X\")(type \"KiCad\")(uri \"1\")) (nested_table (name \"n\")(uri \"b.tbl\")))"),
            ("/b.tbl", "(sym_lib_table (lib (name \"X\")(type \"KiCad\")(uri \"2\")))"),
        ]);
        let err = LibTableLoader::with_source(source).load(Path::new("/a.tbl"), None).unwrap_err();
        assert!(matches!(err, LibTableError::DuplicateNickname(ref n) if n == "X"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = LibTableLoader::with_source(MemorySource::new(&[])).load(Path::new("/none.tbl"), None).unwrap_err();
        assert!(matches!(err, LibTableError::Io { .. }));
    }
}
