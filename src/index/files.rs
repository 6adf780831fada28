//! Source file discovery

use crate::config::ProjectConfig;
use crate::parsers::is_python_file;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Collect every Python file under `root`, respecting .gitignore and the
/// project's exclusion patterns. Sorted for stable runs.
pub fn collect_python_files(root: &Path, config: &ProjectConfig) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .require_git(false)
        .add_custom_ignore_filename(".repographignore");

    let mut files = Vec::new();
    let mut excluded = 0usize;

    for entry in builder.build().flatten() {
        let path = entry.path();
        if !path.is_file() || !is_python_file(path) {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        if config.should_exclude(rel) {
            excluded += 1;
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    debug!(
        "Discovered {} Python files under {} ({} excluded)",
        files.len(),
        root.display(),
        excluded
    );
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collects_python_files_with_exclusions() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pkg/__pycache__")).unwrap();
        fs::create_dir_all(root.join("generated")).unwrap();
        fs::write(root.join("pkg/__init__.py"), "").unwrap();
        fs::write(root.join("pkg/core.py"), "x = 1\n").unwrap();
        fs::write(root.join("pkg/__pycache__/core.py"), "").unwrap();
        fs::write(root.join("generated/api.py"), "").unwrap();
        fs::write(root.join("README.md"), "# readme").unwrap();

        let mut config = ProjectConfig::default();
        config.index.exclude = vec!["generated/".into()];

        let files: Vec<_> = collect_python_files(root, &config)
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            files,
            vec![PathBuf::from("pkg/__init__.py"), PathBuf::from("pkg/core.py")]
        );
    }
}
