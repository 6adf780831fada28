//! Storage interface the indexer writes through and queries against

use super::pattern::{NodeMatch, Pattern, Record};
use super::store_models::{Attrs, CodeNode, EdgeKind, NodeKind};
use petgraph::graph::{EdgeIndex, NodeIndex};

pub type NodeRef = NodeIndex;
pub type EdgeRef = EdgeIndex;

/// Common interface for task-tagged graph stores
pub trait GraphBackend: Send + Sync {
    /// Create or merge a node; see [`crate::graph::GraphStore::upsert_node`]
    fn upsert_node(&self, task: &str, kind: NodeKind, full_name: &str, attrs: Attrs) -> NodeRef;

    /// Create or merge an edge, unique per (kind, start, end)
    fn upsert_edge(
        &self,
        task: &str,
        start: &str,
        kind: EdgeKind,
        end: &str,
        attrs: Attrs,
    ) -> EdgeRef;

    /// Ad hoc structural query
    fn query(&self, pattern: &Pattern) -> Vec<Record>;

    /// Delete all nodes and edges tagged with `task`
    fn clear_task(&self, task: &str) -> usize;

    fn get_node(&self, task: &str, full_name: &str) -> Option<CodeNode> {
        self.query(&Pattern::node(task, NodeMatch::full_name(full_name)))
            .into_iter()
            .next()
            .map(|r| r.start)
    }

    /// End nodes of `(full_name)-[kind]->(*)`
    fn targets(&self, task: &str, full_name: &str, kind: EdgeKind) -> Vec<CodeNode> {
        let pattern = Pattern::path(task, NodeMatch::full_name(full_name), kind, NodeMatch::any());
        self.query(&pattern)
            .into_iter()
            .filter_map(|r| r.end)
            .collect()
    }
}
