//! Name-keyed lookup tables over parsed files

use crate::cache::SourceCache;
use crate::config::ProjectConfig;
use crate::index::{collect_python_files, ClassHierarchy};
use crate::models::{LineRange, ParsedFile};
use crate::parsers::{self, display_path};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A (file, line range) occurrence of a definition
pub type Location = (PathBuf, LineRange);

/// One definition of a class
#[derive(Debug, Clone)]
pub struct ClassEntry {
    pub file: PathBuf,
    pub range: LineRange,
    pub method_ranges: Vec<LineRange>,
    /// Short base names, declaration order
    pub bases: Vec<String>,
}

/// A lexical scope used to place a line inside a class and/or function
#[derive(Debug, Clone)]
struct Scope {
    class: Option<String>,
    func: Option<String>,
    range: LineRange,
}

#[derive(Default)]
pub struct SearchIndex {
    root: PathBuf,
    files: Vec<PathBuf>,
    classes: BTreeMap<String, Vec<ClassEntry>>,
    class_methods: BTreeMap<String, BTreeMap<String, Vec<Location>>>,
    functions: BTreeMap<String, Vec<Location>>,
    scopes: HashMap<PathBuf, Vec<Scope>>,
    sources: SourceCache,
}

/// `mixins.Mixin` -> `Mixin`
fn short_name(written: &str) -> &str {
    written.rsplit('.').next().unwrap_or(written)
}

impl SearchIndex {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            ..Default::default()
        }
    }

    /// Parse every Python file of a project; unparsable files are skipped
    pub fn from_project(root: &Path, config: &ProjectConfig) -> Self {
        let files = collect_python_files(root, config);
        let parsed: Vec<ParsedFile> = files
            .par_iter()
            .filter_map(|path| match parsers::parse_file(path) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    None
                }
            })
            .collect();
        Self::build(root, &parsed)
    }

    pub fn build<'a, I>(root: &Path, files: I) -> Self
    where
        I: IntoIterator<Item = &'a ParsedFile>,
    {
        let mut index = Self::new(root);
        for file in files {
            index.add_file(file);
        }
        index.files.sort();
        debug!(
            "Search index: {} files, {} class names, {} function names",
            index.files.len(),
            index.classes.len(),
            index.functions.len()
        );
        index
    }

    pub fn add_file(&mut self, file: &ParsedFile) {
        let path = file.path.clone();
        let scopes = self.scopes.entry(path.clone()).or_default();

        for class in &file.classes {
            self.classes.entry(class.name.clone()).or_default().push(ClassEntry {
                file: path.clone(),
                range: class.range,
                method_ranges: class.methods.iter().map(|m| m.range).collect(),
                bases: class.bases.iter().map(|b| short_name(b).to_string()).collect(),
            });
            scopes.push(Scope {
                class: Some(class.name.clone()),
                func: None,
                range: class.range,
            });

            let methods = self.class_methods.entry(class.name.clone()).or_default();
            for method in &class.methods {
                methods
                    .entry(method.name.clone())
                    .or_default()
                    .push((path.clone(), method.range));
                scopes.push(Scope {
                    class: Some(class.name.clone()),
                    func: Some(method.name.clone()),
                    range: method.range,
                });
            }
        }

        for func in &file.functions {
            self.functions
                .entry(func.name.clone())
                .or_default()
                .push((path.clone(), func.range));
            scopes.push(Scope {
                class: None,
                func: Some(func.name.clone()),
                range: func.range,
            });
        }

        self.files.push(path);
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn sources(&self) -> &SourceCache {
        &self.sources
    }

    /// Indexed files whose path ends with `suffix`
    pub fn files_matching(&self, suffix: &str) -> Vec<&PathBuf> {
        self.files
            .iter()
            .filter(|f| display_path(f).ends_with(suffix))
            .collect()
    }

    pub fn class_entries(&self, name: &str) -> &[ClassEntry] {
        self.classes.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Direct definitions of `method` in classes named `class`
    pub fn method_locations(&self, class: &str, method: &str) -> &[Location] {
        self.class_methods
            .get(class)
            .and_then(|m| m.get(method))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn function_locations(&self, name: &str) -> &[Location] {
        self.functions.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Innermost (class, function) scope containing `line` (1-based)
    pub fn enclosing_scope(&self, file: &Path, line: u32) -> (Option<String>, Option<String>) {
        self.scopes
            .get(file)
            .and_then(|scopes| {
                scopes
                    .iter()
                    .filter(|s| s.range.contains(line))
                    .min_by_key(|s| s.range.span())
            })
            .map(|s| (s.class.clone(), s.func.clone()))
            .unwrap_or((None, None))
    }

    /// Source lines of a range, as-is
    pub fn code(&self, file: &Path, range: LineRange) -> String {
        self.sources
            .region(file, range.start as usize, range.end as usize)
            .unwrap_or_default()
    }

    /// Class source with method bodies elided: header, class-level
    /// statements and each method's first line
    pub fn class_signature(&self, entry: &ClassEntry) -> String {
        let Some(lines) = self.sources.get_lines(&entry.file) else {
            return String::new();
        };
        let start = entry.range.start as usize;
        let end = (entry.range.end as usize).min(lines.len());

        (start..=end)
            .filter(|&n| {
                let n = n as u32;
                entry
                    .method_ranges
                    .iter()
                    .all(|m| !m.contains(n) || m.start == n)
            })
            .filter_map(|n| lines.get(n - 1))
            .filter(|line| !line.trim().is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ClassHierarchy for SearchIndex {
    /// Bases across every definition of the class name, first-seen order
    fn bases(&self, class: &str) -> Vec<String> {
        let mut bases: Vec<String> = Vec::new();
        for entry in self.class_entries(class) {
            for base in &entry.bases {
                if !bases.contains(base) {
                    bases.push(base.clone());
                }
            }
        }
        bases
    }

    fn defines(&self, class: &str, method: &str) -> bool {
        !self.method_locations(class, method).is_empty()
    }
}
