//! Search results and their text rendering

use super::fuzzy::Suggestion;
use crate::parsers::display_path;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One matched code region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub file_path: PathBuf,
    pub class_name: Option<String>,
    pub func_name: Option<String>,
    pub code: String,
}

impl SearchResult {
    pub fn new(file_path: &Path, class_name: Option<&str>, func_name: Option<&str>, code: String) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
            class_name: class_name.map(String::from),
            func_name: func_name.map(String::from),
            code,
        }
    }

    fn relative(path: &Path, root: &Path) -> String {
        display_path(path.strip_prefix(root).unwrap_or(path))
    }

    fn tagged_prefix(&self, root: &Path) -> String {
        let mut out = format!("<file>{}</file>", Self::relative(&self.file_path, root));
        if let Some(class) = &self.class_name {
            out.push_str(&format!("\n<class>{}</class>", class));
        }
        if let Some(func) = &self.func_name {
            out.push_str(&format!(" <func>{}</func>", func));
        }
        out
    }

    pub fn to_tagged_str(&self, root: &Path) -> String {
        format!("{}\n<code>\n{}\n</code>", self.tagged_prefix(root), self.code)
    }

    /// `- <file>..</file> (n matches)` per file, first-seen order
    pub fn collapse_to_file_level(results: &[SearchResult], root: &Path) -> String {
        let mut counts: Vec<(&Path, usize)> = Vec::new();
        for r in results {
            match counts.iter_mut().find(|(p, _)| *p == r.file_path.as_path()) {
                Some((_, n)) => *n += 1,
                None => counts.push((&r.file_path, 1)),
            }
        }
        counts
            .into_iter()
            .map(|(path, n)| format!("- <file>{}</file> ({} matches)\n", Self::relative(path, root), n))
            .collect()
    }

    /// Like [`Self::collapse_to_file_level`] but one line per function in each file
    pub fn collapse_to_method_level(results: &[SearchResult], root: &Path) -> String {
        let mut counts: Vec<(&Path, Option<&str>, usize)> = Vec::new();
        for r in results {
            let func = r.func_name.as_deref();
            match counts
                .iter_mut()
                .find(|(p, f, _)| *p == r.file_path.as_path() && *f == func)
            {
                Some((_, _, n)) => *n += 1,
                None => counts.push((&r.file_path, func, 1)),
            }
        }
        counts
            .into_iter()
            .map(|(path, func, n)| {
                let file = format!("<file>{}</file>", Self::relative(path, root));
                match func {
                    Some(func) => format!("- {} <func>{}</func> ({} matches)\n", file, func, n),
                    None => format!("- {} Not in a function ({} matches)\n", file, n),
                }
            })
            .collect()
    }
}

/// What every search operation returns: text for a reader, a one-line
/// summary, and whether anything matched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchOutcome {
    pub text: String,
    pub summary: String,
    pub found: bool,
    /// Traversal edges, `a -> b`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
}

impl SearchOutcome {
    pub fn found(text: String, summary: String) -> Self {
        Self {
            text,
            summary,
            found: true,
            ..Default::default()
        }
    }

    /// A miss; the summary repeats the text
    pub fn not_found(text: String) -> Self {
        Self {
            summary: text.clone(),
            text,
            found: false,
            ..Default::default()
        }
    }
}

/// `- Search result i:` blocks for `results`, numbered from 1
pub(crate) fn render_blocks(results: &[SearchResult], root: &Path) -> String {
    results
        .iter()
        .enumerate()
        .map(|(idx, r)| format!("- Search result {}:\n```\n{}\n```\n", idx + 1, r.to_tagged_str(root)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(file: &str, class: Option<&str>, func: Option<&str>) -> SearchResult {
        SearchResult::new(Path::new(file), class, func, "pass".to_string())
    }

    #[test]
    fn test_tagged_str() {
        let root = Path::new("/repo");
        let r = result("/repo/pkg/mod.py", Some("Cls"), Some("run"));
        assert_eq!(
            r.to_tagged_str(root),
            "<file>pkg/mod.py</file>\n<class>Cls</class> <func>run</func>\n<code>\npass\n</code>"
        );

        let top = result("/repo/util.py", None, Some("helper"));
        assert_eq!(
            top.to_tagged_str(root),
            "<file>util.py</file> <func>helper</func>\n<code>\npass\n</code>"
        );
    }

    #[test]
    fn test_collapse_to_file_level_counts_in_order() {
        let root = Path::new("/repo");
        let results = vec![
            result("/repo/b.py", None, None),
            result("/repo/a.py", None, None),
            result("/repo/b.py", None, None),
        ];
        assert_eq!(
            SearchResult::collapse_to_file_level(&results, root),
            "- <file>b.py</file> (2 matches)\n- <file>a.py</file> (1 matches)\n"
        );
    }

    #[test]
    fn test_collapse_to_method_level() {
        let root = Path::new("/repo");
        let results = vec![
            result("/repo/a.py", Some("C"), Some("run")),
            result("/repo/a.py", Some("C"), Some("run")),
            result("/repo/a.py", None, None),
        ];
        assert_eq!(
            SearchResult::collapse_to_method_level(&results, root),
            "- <file>a.py</file> <func>run</func> (2 matches)\n- <file>a.py</file> Not in a function (1 matches)\n"
        );
    }
}
