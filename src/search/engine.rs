//! Query surface over the search index and call graph
//!
//! Every operation is a pure read and returns a [`SearchOutcome`]; a miss is
//! `found = false` with an explanation, never an error.

use super::fuzzy::rank_similar;
use super::index::SearchIndex;
use super::result::{render_blocks, SearchOutcome, SearchResult};
use crate::config::SearchConfig;
use crate::graph::CallGraph;
use crate::index::resolve_method;
use memchr::memmem;
use std::collections::HashSet;
use std::path::Path;

/// Full class bodies shown by [`SearchEngine::class_full_snippet`]
pub const FULL_SNIPPET_LIMIT: usize = 2;

/// Lines of context around a code match
const CONTEXT_LINES: usize = 3;

/// Attributes every class gets from the root `object` type
pub const OBJECT_MEMBERS: &[&str] = &[
    "__class__",
    "__delattr__",
    "__dir__",
    "__doc__",
    "__eq__",
    "__format__",
    "__ge__",
    "__getattribute__",
    "__getstate__",
    "__gt__",
    "__hash__",
    "__init__",
    "__init_subclass__",
    "__le__",
    "__lt__",
    "__ne__",
    "__new__",
    "__reduce__",
    "__reduce_ex__",
    "__repr__",
    "__setattr__",
    "__sizeof__",
    "__str__",
    "__subclasshook__",
];

/// Whether a dotted-path segment looks like a class: `Name` or `_Name`
pub fn is_class_name(segment: &str) -> bool {
    let mut chars = segment.chars();
    match (chars.next(), chars.next()) {
        (Some(first), _) if first.is_uppercase() => true,
        (Some('_'), Some(second)) => second.is_uppercase(),
        _ => false,
    }
}

pub struct SearchEngine {
    index: SearchIndex,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(index: SearchIndex, config: SearchConfig) -> Self {
        Self { index, config }
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    fn root(&self) -> &Path {
        self.index.root()
    }

    fn blocks(&self, results: &[SearchResult]) -> String {
        render_blocks(results, self.root())
    }

    fn file_level(&self, results: &[SearchResult]) -> String {
        SearchResult::collapse_to_file_level(results, self.root())
    }

    /// Results over the display limit collapse to a file listing
    fn limited(&self, mut text: String, results: &[SearchResult]) -> String {
        if results.len() > self.config.show_limit {
            text.push_str("They appeared in the following files:\n");
            text.push_str(&self.file_level(results));
        } else {
            text.push_str(&self.blocks(results));
        }
        text
    }

    // ==================== Classes ====================

    /// Signatures of every class named `name`
    pub fn find_class(&self, name: &str) -> SearchOutcome {
        let results: Vec<SearchResult> = self
            .index
            .class_entries(name)
            .iter()
            .map(|entry| SearchResult::new(&entry.file, Some(name), None, self.index.class_signature(entry)))
            .collect();

        if results.is_empty() {
            return SearchOutcome {
                summary: format!("Class {} did not appear in the codebase.", name),
                ..SearchOutcome::not_found(format!("Could not find class {} in the codebase.", name))
            };
        }

        let header = format!("Found {} classes with name {} in the codebase:\n\n", results.len(), name);
        SearchOutcome::found(
            self.limited(header, &results),
            format!("The tool returned information about class `{}`.", name),
        )
    }

    /// Full bodies of class `name` in files ending with `file_suffix`
    pub fn find_class_in_file(&self, name: &str, file_suffix: &str) -> SearchOutcome {
        let candidates = self.index.files_matching(file_suffix);
        if candidates.is_empty() {
            return SearchOutcome::not_found(format!("Could not find file {} in the codebase.", file_suffix));
        }
        if !self.index.has_class(name) {
            return SearchOutcome::not_found(format!("Could not find class {} in the codebase.", name));
        }

        let results: Vec<SearchResult> = self
            .index
            .class_entries(name)
            .iter()
            .filter(|entry| candidates.contains(&&entry.file))
            .map(|entry| SearchResult::new(&entry.file, Some(name), None, self.index.code(&entry.file, entry.range)))
            .collect();

        if results.is_empty() {
            return SearchOutcome::not_found(format!("Could not find class {} in file {}.", name, file_suffix));
        }

        let header = format!(
            "Found {} classes with name {} in file {}:\n\n",
            results.len(),
            name,
            file_suffix
        );
        SearchOutcome::found(format!("{}{}", header, self.blocks(&results)), header)
    }

    /// Full bodies of class `name`, at most two of them
    pub fn class_full_snippet(&self, name: &str) -> SearchOutcome {
        let results: Vec<SearchResult> = self
            .index
            .class_entries(name)
            .iter()
            .map(|entry| SearchResult::new(&entry.file, Some(name), None, self.index.code(&entry.file, entry.range)))
            .collect();

        if results.is_empty() {
            return SearchOutcome {
                summary: format!("Class {} did not appear in the codebase.", name),
                ..SearchOutcome::not_found(format!("Could not find class {} in the codebase.", name))
            };
        }

        let header = format!("Found {} classes with name {} in the codebase:\n\n", results.len(), name);
        let mut text = header.clone();
        if results.len() > FULL_SNIPPET_LIMIT {
            text.push_str(&format!(
                "Too many results, showing full code for {} of them:\n",
                FULL_SNIPPET_LIMIT
            ));
        }
        text.push_str(&self.blocks(&results[..results.len().min(FULL_SNIPPET_LIMIT)]));
        SearchOutcome::found(text, header)
    }

    // ==================== Methods ====================

    fn method_results(&self, class: &str, method: &str) -> Vec<SearchResult> {
        self.index
            .method_locations(class, method)
            .iter()
            .map(|(file, range)| SearchResult::new(file, Some(class), Some(method), self.index.code(file, *range)))
            .collect()
    }

    /// Top-level functions plus directly defined methods named `name`
    fn codebase_results(&self, name: &str) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = self
            .index
            .function_locations(name)
            .iter()
            .map(|(file, range)| SearchResult::new(file, None, Some(name), self.index.code(file, *range)))
            .collect();
        for class in self.index.class_names() {
            results.extend(self.method_results(class, name));
        }
        results
    }

    /// Method `method` as seen from class `class`, walking its ancestors
    pub fn find_method_in_class(&self, method: &str, class: &str) -> SearchOutcome {
        if !self.index.has_class(class) {
            return SearchOutcome::not_found(format!("Could not find class {} in the codebase.", class));
        }

        let results = match resolve_method(&self.index, class, method) {
            Some(owner) => self.method_results(&owner, method),
            None => Vec::new(),
        };

        if results.is_empty() {
            let text = if OBJECT_MEMBERS.contains(&method) {
                format!(
                    "Method '{}' is not explicitly defined in class '{}', it is inherited from the built-in 'object' class.",
                    method, class
                )
            } else {
                format!("Could not find method {} in class {}.", method, class)
            };
            return SearchOutcome::not_found(text);
        }

        let limit = self.config.show_limit;
        let header = format!(
            "Found {} methods with name {} in class {}:\n\n",
            results.len(),
            method,
            class
        );
        let mut text = header.clone();
        if results.len() > limit {
            text.push_str(&format!(
                "Too many results, showing full code for {} of them, and the rest just file names:\n",
                limit
            ));
        }
        text.push_str(&self.blocks(&results[..results.len().min(limit)]));
        if results.len() > limit {
            text.push_str("Other results are in these files:\n");
            text.push_str(&self.file_level(&results[limit..]));
        }
        SearchOutcome::found(text, header)
    }

    /// Methods and functions named `method` in files ending with `file_suffix`
    pub fn find_method_in_file(&self, method: &str, file_suffix: &str) -> SearchOutcome {
        let candidates = self.index.files_matching(file_suffix);
        if candidates.is_empty() {
            return SearchOutcome::not_found(format!("Could not find file {} in the codebase.", file_suffix));
        }

        let all = self.codebase_results(method);
        if all.is_empty() {
            return SearchOutcome::not_found(format!("The method {} does not appear in the codebase.", method));
        }

        let mut results: Vec<SearchResult> = Vec::new();
        for r in all.into_iter().filter(|r| candidates.contains(&&r.file_path)) {
            let duplicate = results
                .iter()
                .any(|seen| seen.code == r.code && seen.class_name == r.class_name && seen.file_path == r.file_path);
            if !duplicate {
                results.push(r);
            }
        }

        if results.is_empty() {
            return SearchOutcome::not_found(format!(
                "There is no method with name `{}` in file {}.",
                method, file_suffix
            ));
        }

        let header = format!(
            "Found {} methods with name `{}` in file {}:\n\n",
            results.len(),
            method,
            file_suffix
        );
        SearchOutcome::found(format!("{}{}", header, self.blocks(&results)), header)
    }

    /// Every function or method named `name` across the codebase
    pub fn find_method(&self, name: &str) -> SearchOutcome {
        let results = self.codebase_results(name);
        if results.is_empty() {
            return SearchOutcome::not_found(format!("Could not find method {} in the codebase.", name));
        }
        let header = format!("Found {} methods with name {} in the codebase:\n\n", results.len(), name);
        SearchOutcome::found(self.limited(header.clone(), &results), header)
    }

    // ==================== Code ====================

    /// Matches of `snippet` in one file: (1-based line, context window)
    fn code_matches(&self, file: &Path, snippet: &str) -> Vec<(u32, String)> {
        let Some(lines) = self.index.sources().get_lines(file) else {
            return vec![];
        };
        if snippet.is_empty() {
            return vec![];
        }
        let content = lines.join("\n");
        let bytes = content.as_bytes();

        memmem::find_iter(bytes, snippet.as_bytes())
            .map(|pos| {
                let line_idx = memchr::memchr_iter(b'\n', &bytes[..pos]).count();
                let from = line_idx.saturating_sub(CONTEXT_LINES);
                let to = (line_idx + CONTEXT_LINES + 1).min(lines.len());
                let window = (from..to)
                    .map(|i| format!("{} {}", i + 1, lines[i]))
                    .collect::<Vec<_>>()
                    .join("\n");
                (line_idx as u32 + 1, window)
            })
            .collect()
    }

    fn code_results<'a, I>(&self, files: I, snippet: &str) -> Vec<SearchResult>
    where
        I: IntoIterator<Item = &'a std::path::PathBuf>,
    {
        let mut results = Vec::new();
        for file in files {
            for (line, window) in self.code_matches(file, snippet) {
                let (class, func) = self.index.enclosing_scope(file, line);
                results.push(SearchResult::new(file, class.as_deref(), func.as_deref(), window));
            }
        }
        results
    }

    /// Substring search over indexed sources, optionally limited to files
    /// ending with `file_suffix`
    pub fn find_code(&self, snippet: &str, file_suffix: Option<&str>) -> SearchOutcome {
        let Some(suffix) = file_suffix else {
            let results = self.code_results(self.index.files(), snippet);
            if results.is_empty() {
                return SearchOutcome::not_found(format!("Could not find code {} in the codebase.", snippet));
            }
            let header = format!(
                "Found {} snippets containing `{}` in the codebase:\n\n",
                results.len(),
                snippet
            );
            return SearchOutcome::found(self.limited(header.clone(), &results), header);
        };

        let snippet = snippet.strip_suffix(')').unwrap_or(snippet);
        let candidates = self.index.files_matching(suffix);
        if candidates.is_empty() {
            return SearchOutcome::not_found(format!("Could not find file {} in the codebase.", suffix));
        }

        let results = self.code_results(candidates, snippet);
        if results.is_empty() {
            return SearchOutcome::not_found(format!("Could not find code {} in file {}.", snippet, suffix));
        }

        let header = format!(
            "Found {} snippets with code {} in file {}:\n\n",
            results.len(),
            snippet,
            suffix
        );
        let mut text = header.clone();
        if results.len() > self.config.show_limit {
            text.push_str("They appeared in the following methods:\n");
            text.push_str(&SearchResult::collapse_to_method_level(&results, self.root()));
        } else {
            text.push_str(&self.blocks(&results));
        }
        SearchOutcome::found(text, header)
    }

    /// Lines `start..=end` of `file` (relative to the root or absolute)
    pub fn retrieve_code_snippet(&self, file: &Path, start: usize, end: usize) -> SearchOutcome {
        let path = if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.root().join(file)
        };
        match self.index.sources().region(&path, start, end) {
            Some(code) => SearchOutcome::found(
                code,
                format!("Lines {}-{} of {}", start, end, file.display()),
            ),
            None => SearchOutcome::not_found(format!(
                "Could not read lines {}-{} of {}.",
                start,
                end,
                file.display()
            )),
        }
    }

    // ==================== Dotted paths & call graph ====================

    /// Look up `a.b.c.X`, `a.b.X.m` or `a.b.c.f` by what its segments look
    /// like, falling back through file variants and finally to fuzzy
    /// suggestions from the call graph.
    pub fn resolve_dotted_path(&self, dotted: &str, call_graph: &CallGraph, depth: usize) -> SearchOutcome {
        let segments: Vec<&str> = dotted.split('.').collect();
        if segments.len() <= 1 {
            return SearchOutcome::not_found("unvalid input arguments".to_string());
        }
        let n = segments.len();
        let last = segments[n - 1];
        let second_last = segments[n - 2];

        let outcome = if is_class_name(last) {
            // a.b.c.D => a/b/c.py + D
            let file = format!("{}.py", segments[..n - 1].join("/"));
            let in_file = self.find_class_in_file(last, &file);
            if in_file.found {
                in_file
            } else {
                let anywhere = self.find_class(last);
                if anywhere.found {
                    SearchOutcome {
                        text: format!("{}\n{}", in_file.text, anywhere.text),
                        ..anywhere
                    }
                } else {
                    in_file
                }
            }
        } else if is_class_name(second_last) {
            // a.b.C.d => C + d, then a/b.py
            let in_class = self.find_method_in_class(last, second_last);
            if in_class.found {
                in_class
            } else {
                let file = format!("{}.py", segments[..n - 2].join("/"));
                let retry = if last != "__init__" {
                    self.find_method_in_file(last, &file)
                } else {
                    self.find_class_in_file(second_last, &file)
                };
                if retry.found {
                    retry
                } else {
                    in_class
                }
            }
        } else {
            // a.b.c.d => a/b/c.py, a/b/c/__init__.py, then a/b.py
            let module = segments[..n - 1].join("/");
            let mut tries = vec![format!("{}.py", module), format!("{}/__init__.py", module)];
            if n > 2 {
                tries.push(format!("{}.py", segments[..n - 2].join("/")));
            }
            let mut outcome = SearchOutcome::default();
            for file in &tries {
                let attempt = self.find_method_in_file(last, file);
                let done = attempt.found;
                if done || outcome.text.is_empty() {
                    outcome = attempt;
                }
                if done {
                    break;
                }
            }
            outcome
        };

        if outcome.found {
            let neighbors = self.call_graph_neighbors(dotted, call_graph, depth);
            SearchOutcome {
                summary: String::new(),
                edges: neighbors.edges,
                ..outcome
            }
        } else {
            SearchOutcome {
                summary: String::new(),
                suggestions: self.suggest(dotted, call_graph),
                ..outcome
            }
        }
    }

    fn suggest(&self, target: &str, call_graph: &CallGraph) -> Vec<super::fuzzy::Suggestion> {
        rank_similar(
            target,
            call_graph.node_names(),
            self.config.fuzzy_threshold,
            self.config.fuzzy_limit,
        )
    }

    /// Callees of `anchor` up to `depth` hops, depth-first. The anchor is
    /// not listed among the returned nodes.
    pub fn call_graph_neighbors(&self, anchor: &str, call_graph: &CallGraph, depth: usize) -> SearchOutcome {
        if !call_graph.contains(anchor) {
            let suggestions = self.suggest(anchor, call_graph);
            let mut text = format!("Could not find {} in the call graph.", anchor);
            if !suggestions.is_empty() {
                let names: Vec<&str> = suggestions.iter().map(|s| s.name.as_str()).collect();
                text.push_str(&format!(" Similar names: {}", names.join(", ")));
            }
            return SearchOutcome {
                suggestions,
                ..SearchOutcome::not_found(text)
            };
        }

        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut visited = HashSet::new();
        walk_callees(call_graph, anchor, 0, depth, &mut visited, &mut nodes, &mut edges);
        nodes.retain(|n| n != anchor);

        let mut text = format!(
            "Found {} nodes within depth {} of {}:\n",
            nodes.len(),
            depth,
            anchor
        );
        for edge in &edges {
            text.push_str(&format!("- {}\n", edge));
        }
        SearchOutcome {
            nodes,
            edges,
            ..SearchOutcome::found(text, format!("Call graph around `{}`", anchor))
        }
    }
}

fn walk_callees(
    graph: &CallGraph,
    node: &str,
    current: usize,
    depth: usize,
    visited: &mut HashSet<String>,
    nodes: &mut Vec<String>,
    edges: &mut Vec<String>,
) {
    if current > depth {
        return;
    }
    visited.insert(node.to_string());
    nodes.push(node.to_string());

    if current < depth {
        for callee in graph.callees(node) {
            if !visited.contains(callee) {
                edges.push(format!("{} -> {}", node, callee));
                walk_callees(graph, callee, current + 1, depth, visited, nodes, edges);
            }
        }
    }
}
