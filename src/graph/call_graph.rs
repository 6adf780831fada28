//! Lightweight call graph for neighbourhood queries
//!
//! Lives next to, not inside, the persistent store: nodes are plain
//! identifier strings and edges carry no data.

use super::store_models::EdgeKind;
use super::traits::GraphBackend;
use super::pattern::{NodeMatch, Pattern};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;

#[derive(Debug, Default, Clone)]
pub struct CallGraph {
    graph: DiGraph<String, ()>,
    index: FxHashMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (caller, callee) pairs
    pub fn from_edges<I, S>(edges: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let mut graph = Self::new();
        for (caller, callee) in edges {
            graph.add_call(caller.as_ref(), callee.as_ref());
        }
        graph
    }

    /// Build from the CALL edges of one task
    pub fn from_backend(backend: &dyn GraphBackend, task: &str) -> Self {
        let pattern = Pattern::path(task, NodeMatch::any(), EdgeKind::Calls, NodeMatch::any());
        let edges = backend
            .query(&pattern)
            .into_iter()
            .filter_map(|r| Some((r.start.full_name, r.end?.full_name)));
        Self::from_edges(edges)
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub fn add_call(&mut self, caller: &str, callee: &str) {
        let from = self.ensure_node(caller);
        let to = self.ensure_node(callee);
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All node names, in insertion order
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(String::as_str)
    }

    /// Direct callees of `name`, in insertion order
    pub fn callees(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Direct callers of `name`, in insertion order
    pub fn callers(&self, name: &str) -> Vec<&str> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&str> {
        let Some(&idx) = self.index.get(name) else {
            return vec![];
        };
        let mut edges: Vec<_> = self.graph.edges_directed(idx, direction).collect();
        edges.sort_by_key(|e| e.id());
        edges
            .into_iter()
            .map(|e| {
                let other = if direction == Direction::Outgoing {
                    e.target()
                } else {
                    e.source()
                };
                self.graph[other].as_str()
            })
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::graph::GraphStore;

    #[test]
    fn test_neighbors_keep_insertion_order() {
        let graph = CallGraph::from_edges([("a", "b"), ("a", "c"), ("a", "b"), ("d", "a")]);

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.callees("a"), vec!["b", "c"]);
        assert_eq!(graph.callers("a"), vec!["d"]);
        assert!(graph.callees("missing").is_empty());
    }

    #[test]
    fn test_from_backend_reads_call_edges_only() {
        let store = GraphStore::in_memory();
        store.upsert_edge("t", "m.run", EdgeKind::Calls, "m.helper", attrs!());
        store.upsert_edge("t", "m", EdgeKind::Contains, "m.run", attrs!());
        store.upsert_edge("other", "x.f", EdgeKind::Calls, "x.g", attrs!());

        let graph = CallGraph::from_backend(&store, "t");
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.contains("m.run"));
        assert!(!graph.contains("x.f"));
    }
}
