//! Structural query patterns over the code graph
//!
//! A [`Pattern`] is either a single node match or a one-hop path
//! `(start)-[edge]->(end)`, always scoped to one task.

use super::store_models::{CodeEdge, CodeNode, EdgeKind, NodeKind};

/// Constraints on one node; `None` fields match anything
#[derive(Debug, Clone, Default)]
pub struct NodeMatch {
    pub kind: Option<NodeKind>,
    pub full_name: Option<String>,
    pub name: Option<String>,
}

impl NodeMatch {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn full_name(full_name: &str) -> Self {
        Self {
            full_name: Some(full_name.to_string()),
            ..Self::default()
        }
    }

    pub fn kind(kind: NodeKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn matches(&self, node: &CodeNode) -> bool {
        self.kind.map_or(true, |k| node.kind == k)
            && self.full_name.as_deref().map_or(true, |f| node.full_name == f)
            && self.name.as_deref().map_or(true, |n| node.name() == n)
    }
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub task: String,
    pub start: NodeMatch,
    /// Relationship to follow; `None` makes this a node-only pattern
    pub edge: Option<EdgeKind>,
    pub end: NodeMatch,
}

impl Pattern {
    /// `(n)` matching `node`
    pub fn node(task: &str, node: NodeMatch) -> Self {
        Self {
            task: task.to_string(),
            start: node,
            edge: None,
            end: NodeMatch::any(),
        }
    }

    /// `(start)-[kind]->(end)`
    pub fn path(task: &str, start: NodeMatch, kind: EdgeKind, end: NodeMatch) -> Self {
        Self {
            task: task.to_string(),
            start,
            edge: Some(kind),
            end,
        }
    }
}

/// One query match. `edge` and `end` are set for path patterns only.
#[derive(Debug, Clone)]
pub struct Record {
    pub start: CodeNode,
    pub edge: Option<CodeEdge>,
    pub end: Option<CodeNode>,
}
