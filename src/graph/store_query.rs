use super::pattern::{Pattern, Record};
use super::store::GraphStore;
use super::store_models::{Attrs, CodeNode, EdgeKind, NodeKind};
use super::traits::{EdgeRef, GraphBackend, NodeRef};

impl GraphBackend for GraphStore {
    fn upsert_node(&self, task: &str, kind: NodeKind, full_name: &str, attrs: Attrs) -> NodeRef {
        GraphStore::upsert_node(self, task, kind, full_name, attrs)
    }

    fn upsert_edge(
        &self,
        task: &str,
        start: &str,
        kind: EdgeKind,
        end: &str,
        attrs: Attrs,
    ) -> EdgeRef {
        GraphStore::upsert_edge(self, task, start, kind, end, attrs)
    }

    fn query(&self, pattern: &Pattern) -> Vec<Record> {
        GraphStore::query(self, pattern)
    }

    fn clear_task(&self, task: &str) -> usize {
        GraphStore::clear_task(self, task)
    }

    fn get_node(&self, task: &str, full_name: &str) -> Option<CodeNode> {
        GraphStore::get_node(self, task, full_name)
    }

    fn targets(&self, task: &str, full_name: &str, kind: EdgeKind) -> Vec<CodeNode> {
        GraphStore::outgoing(self, task, full_name, kind)
            .into_iter()
            .map(|(_, node)| node)
            .collect()
    }
}
