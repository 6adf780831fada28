//! Inheritance graph and method propagation
//!
//! Base lists are kept in declaration order; that order decides which
//! ancestor wins when several define the same method.

use super::mutator::GraphMutator;
use super::resolver::{ReferenceResolver, VisitedFiles};
use crate::attrs;
use crate::error::{Diagnostic, IndexResult, ReferenceKind};
use crate::graph::{EdgeKind, GraphBackend, NodeKind};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, RwLock};

/// Methods that are never inherited through a HAS_METHOD edge
pub const CONSTRUCTORS: &[&str] = &["__init__"];

pub fn is_constructor(method: &str) -> bool {
    CONSTRUCTORS.contains(&method)
}

/// Read-only view of a class hierarchy
pub trait ClassHierarchy {
    /// Bases of `class` in declaration order
    fn bases(&self, class: &str) -> Vec<String>;

    /// Whether `class` itself defines `method`
    fn defines(&self, class: &str, method: &str) -> bool;
}

/// First class, starting at `class` and walking bases depth-first in
/// declaration order, that defines `method`.
///
/// Constructors only resolve on `class` itself. `None` means the method can
/// only come from the implicit root object.
pub fn resolve_method<H: ClassHierarchy + ?Sized>(
    hierarchy: &H,
    class: &str,
    method: &str,
) -> Option<String> {
    let mut visited = HashSet::new();
    resolve_from(hierarchy, class, method, true, &mut visited)
}

fn resolve_from<H: ClassHierarchy + ?Sized>(
    hierarchy: &H,
    class: &str,
    method: &str,
    is_start: bool,
    visited: &mut HashSet<String>,
) -> Option<String> {
    if !visited.insert(class.to_string()) {
        return None;
    }
    if (is_start || !is_constructor(method)) && hierarchy.defines(class, method) {
        return Some(class.to_string());
    }
    for base in hierarchy.bases(class) {
        if let Some(found) = resolve_from(hierarchy, &base, method, false, visited) {
            return Some(found);
        }
    }
    None
}

fn lock_pairs(pairs: &Mutex<HashSet<(String, String)>>) -> MutexGuard<'_, HashSet<(String, String)>> {
    // The set stays valid even if a holder panicked
    pairs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Per-session inheritance state
#[derive(Default)]
pub struct InheritanceEngine {
    bases: RwLock<HashMap<String, Vec<String>>>,
    processed: Mutex<HashSet<(String, String)>>,
}

impl InheritanceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bases_of(&self, class: &str) -> Vec<String> {
        self.bases
            .read()
            .map(|b| b.get(class).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Classes with at least one recorded base
    pub fn classes(&self) -> Vec<String> {
        self.bases
            .read()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Resolve each written base of `class_fqn` and emit INHERITS edges.
    ///
    /// Unresolved bases are skipped and returned as diagnostics.
    pub fn record_bases(
        &self,
        class_fqn: &str,
        bases_as_written: &[String],
        context_module: &str,
        resolver: &dyn ReferenceResolver,
        visited: &mut VisitedFiles,
        mutator: &GraphMutator,
    ) -> IndexResult<Vec<Diagnostic>> {
        let mut resolved = Vec::with_capacity(bases_as_written.len());
        let mut diagnostics = Vec::new();

        for written in bases_as_written {
            match resolver.resolve_reference(written, context_module, visited)? {
                Some(base) if base.kind == NodeKind::Class => {
                    if !resolved.contains(&base.full_name) {
                        resolved.push(base.full_name);
                    }
                }
                _ => {
                    tracing::debug!("Unresolved base '{}' of {}", written, class_fqn);
                    diagnostics.push(Diagnostic {
                        kind: ReferenceKind::Base,
                        context: class_fqn.to_string(),
                        name: written.clone(),
                    });
                }
            }
        }

        for (order, base) in resolved.iter().enumerate() {
            mutator.upsert_edge(EdgeKind::Inherits, class_fqn, base, attrs! { "order" => order })?;
        }

        if let Ok(mut bases) = self.bases.write() {
            bases.insert(class_fqn.to_string(), resolved);
        }
        Ok(diagnostics)
    }

    /// Add HAS_METHOD edges from `class_fqn` to every method it inherits.
    ///
    /// Returns how many (class, ancestor) pairs were newly processed; a
    /// repeated request returns 0 without touching the store.
    pub fn propagate_methods(&self, class_fqn: &str, mutator: &GraphMutator) -> IndexResult<usize> {
        let mut processed = 0;
        for base in self.bases_of(class_fqn) {
            processed += self.propagate_pair(class_fqn, &base, mutator)?;
        }
        Ok(processed)
    }

    fn propagate_pair(&self, class_fqn: &str, base: &str, mutator: &GraphMutator) -> IndexResult<usize> {
        if !lock_pairs(&self.processed).insert((class_fqn.to_string(), base.to_string())) {
            return Ok(0);
        }

        let methods = mutator
            .backend()
            .targets(mutator.task(), base, EdgeKind::HasMethod);
        for method in methods {
            if method.kind != NodeKind::Method || is_constructor(method.name()) {
                continue;
            }
            mutator.upsert_edge(
                EdgeKind::HasMethod,
                class_fqn,
                &method.full_name,
                attrs! { "inherited_from" => base },
            )?;
        }

        let mut processed = 1;
        for ancestor in self.bases_of(base) {
            processed += self.propagate_pair(class_fqn, &ancestor, mutator)?;
        }
        Ok(processed)
    }

    /// Hierarchy view over the recorded bases and the store's method nodes
    pub fn hierarchy<'a>(&'a self, backend: &'a dyn GraphBackend, task: &'a str) -> StoreHierarchy<'a> {
        StoreHierarchy {
            engine: self,
            backend,
            task,
        }
    }
}

pub struct StoreHierarchy<'a> {
    engine: &'a InheritanceEngine,
    backend: &'a dyn GraphBackend,
    task: &'a str,
}

impl ClassHierarchy for StoreHierarchy<'_> {
    fn bases(&self, class: &str) -> Vec<String> {
        self.engine.bases_of(class)
    }

    fn defines(&self, class: &str, method: &str) -> bool {
        self.backend
            .get_node(self.task, &format!("{}.{}", class, method))
            .map_or(false, |n| n.kind == NodeKind::Method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Table(HashMap<&'static str, (Vec<&'static str>, Vec<&'static str>)>);

    impl ClassHierarchy for Table {
        fn bases(&self, class: &str) -> Vec<String> {
            self.0
                .get(class)
                .map(|(b, _)| b.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default()
        }

        fn defines(&self, class: &str, method: &str) -> bool {
            self.0.get(class).map_or(false, |(_, m)| m.contains(&method))
        }
    }

    fn table() -> Table {
        let mut t = HashMap::new();
        t.insert("A", (vec![], vec!["__init__", "m", "only_a"]));
        t.insert("B1", (vec!["A"], vec!["m"]));
        t.insert("B2", (vec!["A"], vec!["m", "only_b2"]));
        t.insert("C", (vec!["B1", "B2"], vec![]));
        // Cyclic declarations still terminate
        t.insert("X", (vec!["Y"], vec![]));
        t.insert("Y", (vec!["X"], vec![]));
        Table(t)
    }

    #[test]
    fn test_first_declared_base_wins() {
        assert_eq!(resolve_method(&table(), "C", "m"), Some("B1".to_string()));
        assert_eq!(resolve_method(&table(), "C", "only_b2"), Some("B2".to_string()));
        assert_eq!(resolve_method(&table(), "C", "only_a"), Some("A".to_string()));
    }

    #[test]
    fn test_constructor_not_inherited() {
        assert_eq!(resolve_method(&table(), "C", "__init__"), None);
        assert_eq!(resolve_method(&table(), "A", "__init__"), Some("A".to_string()));
    }

    #[test]
    fn test_cycle_terminates() {
        assert_eq!(resolve_method(&table(), "X", "anything"), None);
    }
}
