//! Serialized graph writes
//!
//! Every upsert for a task runs under that task's mutex. The guard is held
//! for one store call only, so workers indexing different files still
//! interleave freely between writes.

use crate::error::{IndexError, IndexResult};
use crate::graph::{Attrs, EdgeKind, EdgeRef, GraphBackend, NodeKind, NodeRef};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};

/// One mutual-exclusion domain per task tag.
///
/// Mutators built from the same registry share locks; sessions that should
/// serialize against each other must share a registry.
#[derive(Clone, Default)]
pub struct LockRegistry {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, task: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(task.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Idempotent writer for one task
#[derive(Clone)]
pub struct GraphMutator {
    backend: Arc<dyn GraphBackend>,
    task: String,
    lock: Arc<Mutex<()>>,
}

impl GraphMutator {
    pub fn new(backend: Arc<dyn GraphBackend>, task: &str, registry: &LockRegistry) -> Self {
        Self {
            backend,
            task: task.to_string(),
            lock: registry.lock_for(task),
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn backend(&self) -> &dyn GraphBackend {
        self.backend.as_ref()
    }

    fn with_lock<T>(&self, write: impl FnOnce(&dyn GraphBackend) -> T) -> IndexResult<T> {
        // A poisoned lock means another writer died mid-upsert
        let _guard = self.lock.lock().map_err(|_| {
            tracing::warn!("Store lock for task '{}' is poisoned", self.task);
            IndexError::LockAcquisition {
                task: self.task.clone(),
            }
        })?;
        Ok(write(self.backend.as_ref()))
    }

    /// Create or merge a node. Placeholders are promoted to `kind`.
    pub fn upsert_node(&self, kind: NodeKind, full_name: &str, attrs: Attrs) -> IndexResult<NodeRef> {
        self.with_lock(|b| b.upsert_node(&self.task, kind, full_name, attrs))
    }

    /// Create or merge an edge; repeated calls never duplicate it
    pub fn upsert_edge(
        &self,
        kind: EdgeKind,
        start: &str,
        end: &str,
        attrs: Attrs,
    ) -> IndexResult<EdgeRef> {
        self.with_lock(|b| b.upsert_edge(&self.task, start, kind, end, attrs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::graph::GraphStore;

    #[test]
    fn test_concurrent_writers_do_not_duplicate() {
        let store = Arc::new(GraphStore::in_memory());
        let registry = LockRegistry::new();
        let mutator = GraphMutator::new(store.clone(), "t", &registry);

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let mutator = mutator.clone();
                scope.spawn(move || {
                    for i in 0..20 {
                        mutator
                            .upsert_node(NodeKind::Class, "m.Shared", attrs! { "worker" => worker })
                            .expect("upsert node");
                        mutator
                            .upsert_edge(EdgeKind::Contains, "m", &format!("m.C{}", i), attrs!())
                            .expect("upsert edge");
                    }
                });
            }
        });

        // m, m.Shared and m.C0..m.C19
        assert_eq!(store.node_count(Some("t")), 22);
        assert_eq!(store.edge_count(Some("t")), 20);
    }

    #[test]
    fn test_registry_shares_lock_per_task() {
        let registry = LockRegistry::new();
        let a = registry.lock_for("t");
        let b = registry.lock_for("t");
        let c = registry.lock_for("other");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_poisoned_lock_is_lock_failure() {
        let store = Arc::new(GraphStore::in_memory());
        let registry = LockRegistry::new();
        let mutator = GraphMutator::new(store, "t", &registry);

        let lock = registry.lock_for("t");
        let _ = std::thread::spawn(move || {
            let _guard = lock.lock().expect("first lock");
            panic!("writer died");
        })
        .join();

        let err = mutator
            .upsert_node(NodeKind::Module, "m", attrs!())
            .expect_err("poisoned lock should fail");
        assert!(matches!(err, IndexError::LockAcquisition { .. }));
    }
}
