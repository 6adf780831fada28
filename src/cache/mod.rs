//! Source caching for search
//!
//! Search renders code regions straight from source files; the cache keeps
//! each file's lines so repeated snippet requests don't re-read the disk.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Thread-safe file line cache
#[derive(Clone, Default)]
pub struct SourceCache {
    lines: Arc<DashMap<PathBuf, Arc<Vec<String>>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get file lines (cached)
    pub fn get_lines(&self, path: &Path) -> Option<Arc<Vec<String>>> {
        if let Some(lines) = self.lines.get(path) {
            return Some(Arc::clone(&lines));
        }

        let content = std::fs::read_to_string(path).ok()?;
        let lines: Vec<String> = content.lines().map(String::from).collect();
        let arc = Arc::new(lines);
        self.lines.insert(path.to_path_buf(), Arc::clone(&arc));
        Some(arc)
    }

    /// Lines `start..=end` (1-based, clamped to the file) joined with '\n'
    pub fn region(&self, path: &Path, start: usize, end: usize) -> Option<String> {
        let lines = self.get_lines(path)?;
        if lines.is_empty() || start == 0 || start > end || start > lines.len() {
            return None;
        }
        let end = end.min(lines.len());
        Some(lines[start - 1..end].join("\n"))
    }

    /// Number of cached files
    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_is_one_based_and_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("virtual.py");
        std::fs::write(&path, "a\nb\nc\nd\n").unwrap();
        let cache = SourceCache::new();

        assert_eq!(cache.region(&path, 2, 3).as_deref(), Some("b\nc"));
        assert_eq!(cache.region(&path, 3, 99).as_deref(), Some("c\nd"));
        assert!(cache.region(&path, 0, 2).is_none());
        assert!(cache.region(&path, 5, 6).is_none());
        assert!(cache.region(&path, 3, 2).is_none());
        assert!(cache.region(&dir.path().join("missing.py"), 1, 1).is_none());
    }

    #[test]
    fn test_reads_from_disk_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.py");
        std::fs::write(&path, "x = 1\n").unwrap();

        let cache = SourceCache::new();
        assert_eq!(cache.get_lines(&path).map(|l| l.len()), Some(1));
        std::fs::write(&path, "x = 1\ny = 2\n").unwrap();
        // Still served from the cache
        assert_eq!(cache.get_lines(&path).map(|l| l.len()), Some(1));
        assert_eq!(cache.len(), 1);
    }
}
