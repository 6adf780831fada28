//! Python source parsing using tree-sitter
//!
//! `python::extract` turns one file into a [`ParsedFile`]; the helpers here
//! map file paths to dotted module names and back.

pub mod python;

use crate::error::{IndexError, IndexResult};
use crate::models::{ImportStmt, ParsedFile};
use std::path::{Component, Path, PathBuf};

/// Package initializer file name
pub const PACKAGE_INIT: &str = "__init__.py";

/// Read and extract a Python file
pub fn parse_file(path: &Path) -> IndexResult<ParsedFile> {
    let source = std::fs::read_to_string(path).map_err(|source| IndexError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    python::extract(path, &source)
}

pub fn is_python_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("py")
}

/// Path components of `path` relative to `root` as strings
fn relative_parts(root: &Path, path: &Path) -> Vec<String> {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Dotted module name of a file relative to the project root.
///
/// `pkg/sub/mod.py` maps to `pkg.sub.mod`; a package initializer
/// `pkg/sub/__init__.py` maps to its directory, `pkg.sub`. An initializer at
/// the root itself takes the root directory's name.
pub fn module_name(root: &Path, path: &Path) -> String {
    let mut parts = relative_parts(root, path);
    if let Some(last) = parts.pop() {
        if last != PACKAGE_INIT {
            let stem = last.strip_suffix(".py").unwrap_or(&last).to_string();
            parts.push(stem);
        }
    }
    if parts.is_empty() {
        return root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    parts.join(".")
}

/// Dotted name of a directory relative to the root (empty for the root)
fn package_name(root: &Path, dir: &Path) -> String {
    relative_parts(root, dir).join(".")
}

/// Directory a dotted module name lives in
pub fn module_dir(root: &Path, module: &str) -> PathBuf {
    module
        .split('.')
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// `<root>/a/b/__init__.py` for module `a.b`
pub fn package_init_path(root: &Path, module: &str) -> PathBuf {
    module_dir(root, module).join(PACKAGE_INIT)
}

/// Absolute dotted name of the module a `from ... import` targets.
///
/// Relative imports climb `level - 1` directories from the importing file's
/// package.
pub fn import_target_module(root: &Path, file: &Path, stmt: &ImportStmt) -> String {
    if stmt.level == 0 {
        return stmt.module.clone();
    }

    let mut base = file.parent().unwrap_or(root).to_path_buf();
    for _ in 1..stmt.level {
        if base == root {
            break;
        }
        base = base.parent().unwrap_or(root).to_path_buf();
    }

    let package = package_name(root, &base);
    match (package.is_empty(), stmt.module.is_empty()) {
        (true, _) => stmt.module.clone(),
        (false, true) => package,
        (false, false) => format!("{}.{}", package, stmt.module),
    }
}

/// Path rendered with forward slashes, used for suffix matching
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImportKind, ImportedName};

    fn from_import(module: &str, level: usize) -> ImportStmt {
        ImportStmt {
            kind: ImportKind::From,
            module: module.to_string(),
            level,
            names: vec![ImportedName { name: "x".into(), alias: None }],
            line: 1,
        }
    }

    #[test]
    fn test_module_name_for_plain_file() {
        let root = Path::new("/repo");
        assert_eq!(module_name(root, Path::new("/repo/pkg/sub/mod.py")), "pkg.sub.mod");
        assert_eq!(module_name(root, Path::new("/repo/top.py")), "top");
    }

    #[test]
    fn test_module_name_for_package_initializer() {
        let root = Path::new("/repo");
        assert_eq!(module_name(root, Path::new("/repo/pkg/sub/__init__.py")), "pkg.sub");
        assert_eq!(module_name(root, Path::new("/repo/__init__.py")), "repo");
    }

    #[test]
    fn test_package_init_path() {
        let root = Path::new("/repo");
        assert_eq!(
            package_init_path(root, "pkg.sub"),
            PathBuf::from("/repo/pkg/sub/__init__.py")
        );
    }

    #[test]
    fn test_relative_import_targets() {
        let root = Path::new("/repo");
        let file = Path::new("/repo/pkg/sub/mod.py");

        assert_eq!(import_target_module(root, file, &from_import("os.path", 0)), "os.path");
        assert_eq!(import_target_module(root, file, &from_import("sibling", 1)), "pkg.sub.sibling");
        assert_eq!(import_target_module(root, file, &from_import("", 1)), "pkg.sub");
        assert_eq!(import_target_module(root, file, &from_import("other", 2)), "pkg.other");
    }
}
