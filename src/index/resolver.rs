//! Name resolution against the already-built graph
//!
//! A name is looked up through the CONTAINS edges of its context module. On
//! a miss the module's own file (plain module or package initializer) is
//! indexed on the spot and the lookup retried once.

use crate::error::IndexResult;
use crate::graph::{EdgeKind, GraphBackend, NodeKind, NodeMatch, Pattern};
use crate::parsers::{module_dir, package_init_path};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A reference mapped to an indexed symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub full_name: String,
    pub kind: NodeKind,
}

/// Files entered during one top-level indexing call.
///
/// Each top-level call owns its own set; parallel workers never share one.
#[derive(Debug, Default)]
pub struct VisitedFiles(HashSet<PathBuf>);

impl VisitedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the file was already entered
    pub fn enter(&mut self, path: &Path) -> bool {
        self.0.insert(path.to_path_buf())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Indexes a module's file on demand during resolution
pub trait ModuleIndexer {
    fn index_module_file(&self, path: &Path, visited: &mut VisitedFiles) -> IndexResult<()>;
}

/// Full reference resolution including import aliases and dotted names
pub trait ReferenceResolver {
    fn resolve_reference(
        &self,
        name: &str,
        module: &str,
        visited: &mut VisitedFiles,
    ) -> IndexResult<Option<Resolved>>;
}

pub struct NameResolver<'a> {
    backend: &'a dyn GraphBackend,
    task: &'a str,
    root: &'a Path,
}

impl<'a> NameResolver<'a> {
    pub fn new(backend: &'a dyn GraphBackend, task: &'a str, root: &'a Path) -> Self {
        Self {
            backend,
            task,
            root,
        }
    }

    /// `module CONTAINS <name>` in the current graph, matching either the
    /// contained symbol's name or the alias it was imported under
    pub fn lookup(&self, name: &str, module: &str) -> Option<Resolved> {
        let pattern = Pattern::path(
            self.task,
            NodeMatch::full_name(module),
            EdgeKind::Contains,
            NodeMatch::any(),
        );
        let records = self.backend.query(&pattern);

        let by_alias = records.iter().find(|r| {
            r.edge
                .as_ref()
                .and_then(|e| e.get_str("alias"))
                .map_or(false, |alias| alias == name)
        });
        let hit = by_alias.or_else(|| {
            records.iter().find(|r| {
                let aliased = r.edge.as_ref().map_or(false, |e| e.get_str("alias").is_some());
                !aliased && r.end.as_ref().map_or(false, |n| n.name() == name)
            })
        })?;

        hit.end.as_ref().map(|node| Resolved {
            full_name: node.full_name.clone(),
            kind: node.kind,
        })
    }

    /// Files that define `module`: `a/b.py` or `a/b/__init__.py`
    fn module_files(&self, module: &str) -> Vec<PathBuf> {
        let dir = module_dir(self.root, module);
        let mut files = Vec::with_capacity(2);
        if let (Some(parent), Some(stem)) = (dir.parent(), dir.file_name()) {
            files.push(parent.join(format!("{}.py", stem.to_string_lossy())));
        }
        files.push(package_init_path(self.root, module));
        files
    }

    /// Resolve `name` as seen from `module`.
    ///
    /// Returns `Ok(None)` when the name stays unresolved; that is never an
    /// error. Errors come only from the nested indexing of a module file.
    pub fn resolve(
        &self,
        name: &str,
        module: &str,
        visited: &mut VisitedFiles,
        indexer: &dyn ModuleIndexer,
    ) -> IndexResult<Option<Resolved>> {
        if let Some(found) = self.lookup(name, module) {
            return Ok(Some(found));
        }

        let pending: Vec<PathBuf> = self
            .module_files(module)
            .into_iter()
            .filter(|f| f.is_file() && !visited.contains(f))
            .collect();
        if !pending.is_empty() {
            for file in &pending {
                tracing::trace!("Indexing {} to resolve '{}'", file.display(), name);
                indexer.index_module_file(file, visited)?;
            }
            if let Some(found) = self.lookup(name, module) {
                return Ok(Some(found));
            }
        }

        // `from pkg import submodule`
        let submodule = format!("{}.{}", module, name);
        Ok(self
            .backend
            .get_node(self.task, &submodule)
            .filter(|n| n.kind == NodeKind::Module)
            .map(|n| Resolved {
                full_name: n.full_name,
                kind: n.kind,
            }))
    }
}
