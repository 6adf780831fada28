//! Pure Rust graph storage using petgraph + redb
//!
//! Every node and edge carries a task tag. Several indexing tasks can share
//! one store; `clear_task` drops exactly one of them.

use anyhow::{Context, Result};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::RwLock;

use super::pattern::{Pattern, Record};
pub use super::store_models::{Attrs, CodeEdge, CodeNode, EdgeKind, NodeKind};

/// (task, full_name)
type NodeKey = (String, String);

fn key(task: &str, full_name: &str) -> NodeKey {
    (task.to_string(), full_name.to_string())
}

/// Task-tagged graph store
pub struct GraphStore {
    /// In-memory graph
    graph: RwLock<DiGraph<CodeNode, CodeEdge>>,
    /// Node lookup by (task, full name)
    node_index: RwLock<HashMap<NodeKey, NodeIndex>>,
    /// Persistence layer (optional)
    db: Option<redb::Database>,
}

// redb table definitions
const NODES_TABLE: redb::TableDefinition<&str, &[u8]> = redb::TableDefinition::new("nodes");
const EDGES_TABLE: redb::TableDefinition<&str, &[u8]> = redb::TableDefinition::new("edges");

impl GraphStore {
    /// Create or open a graph store in the given directory
    pub fn new(db_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(db_path)?;

        let db_file = db_path.join("graph.redb");
        let db = redb::Database::create(&db_file).context("Failed to open redb database")?;

        let store = Self {
            graph: RwLock::new(DiGraph::new()),
            node_index: RwLock::new(HashMap::new()),
            db: Some(db),
        };

        store.load()?;

        Ok(store)
    }

    /// Create an in-memory only store (no persistence)
    pub fn in_memory() -> Self {
        Self {
            graph: RwLock::new(DiGraph::new()),
            node_index: RwLock::new(HashMap::new()),
            db: None,
        }
    }

    // ==================== Lock Helpers ====================
    //
    // RwLock poisoning means a thread panicked while holding the lock and the
    // graph may be half-updated. These helpers centralise the `.expect()`
    // calls with clear messages.

    fn read_graph(&self) -> std::sync::RwLockReadGuard<'_, DiGraph<CodeNode, CodeEdge>> {
        self.graph
            .read()
            .expect("graph lock poisoned: a thread panicked while holding this lock")
    }

    fn write_graph(&self) -> std::sync::RwLockWriteGuard<'_, DiGraph<CodeNode, CodeEdge>> {
        self.graph
            .write()
            .expect("graph lock poisoned: a thread panicked while holding this lock")
    }

    fn read_index(&self) -> std::sync::RwLockReadGuard<'_, HashMap<NodeKey, NodeIndex>> {
        self.node_index
            .read()
            .expect("index lock poisoned: a thread panicked while holding this lock")
    }

    fn write_index(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<NodeKey, NodeIndex>> {
        self.node_index
            .write()
            .expect("index lock poisoned: a thread panicked while holding this lock")
    }

    // ==================== Node Operations ====================

    /// Create a node or merge `attrs` into the existing one.
    ///
    /// An existing placeholder (or FUNCTION later seen as a METHOD) is
    /// relabelled to `kind`; any other existing kind is kept.
    pub fn upsert_node(&self, task: &str, kind: NodeKind, full_name: &str, attrs: Attrs) -> NodeIndex {
        let mut graph = self.write_graph();
        let mut index = self.write_index();
        Self::upsert_node_locked(&mut graph, &mut index, task, kind, full_name, attrs)
    }

    fn upsert_node_locked(
        graph: &mut DiGraph<CodeNode, CodeEdge>,
        index: &mut HashMap<NodeKey, NodeIndex>,
        task: &str,
        kind: NodeKind,
        full_name: &str,
        attrs: Attrs,
    ) -> NodeIndex {
        if let Some(&idx) = index.get(&key(task, full_name)) {
            if let Some(existing) = graph.node_weight_mut(idx) {
                if existing.kind.can_become(kind) {
                    tracing::trace!("Promoting {} from {} to {}", full_name, existing.kind, kind);
                    existing.kind = kind;
                }
                existing.merge(attrs);
            }
            return idx;
        }

        let mut node = CodeNode::new(task, kind, full_name);
        node.merge(attrs);
        let idx = graph.add_node(node);
        index.insert(key(task, full_name), idx);
        idx
    }

    /// Get node by task and full name
    pub fn get_node(&self, task: &str, full_name: &str) -> Option<CodeNode> {
        let graph = self.read_graph();
        let index = self.read_index();

        index
            .get(&key(task, full_name))
            .and_then(|&idx| graph.node_weight(idx).cloned())
    }

    /// Number of nodes, optionally restricted to one task
    pub fn node_count(&self, task: Option<&str>) -> usize {
        let graph = self.read_graph();
        match task {
            Some(t) => graph.node_weights().filter(|n| n.task == t).count(),
            None => graph.node_count(),
        }
    }

    // ==================== Edge Operations ====================

    /// Create an edge or merge `attrs` into the existing one.
    ///
    /// Edges are unique per (kind, start, end). Missing endpoints are created
    /// as placeholders.
    pub fn upsert_edge(
        &self,
        task: &str,
        start: &str,
        kind: EdgeKind,
        end: &str,
        attrs: Attrs,
    ) -> EdgeIndex {
        let mut graph = self.write_graph();
        let mut index = self.write_index();

        let from = Self::upsert_node_locked(
            &mut graph,
            &mut index,
            task,
            NodeKind::Placeholder,
            start,
            Attrs::new(),
        );
        let to = Self::upsert_node_locked(
            &mut graph,
            &mut index,
            task,
            NodeKind::Placeholder,
            end,
            Attrs::new(),
        );

        let existing = graph
            .edges_connecting(from, to)
            .find(|e| e.weight().kind == kind)
            .map(|e| e.id());

        match existing {
            Some(id) => {
                if let Some(edge) = graph.edge_weight_mut(id) {
                    edge.properties.extend(attrs);
                }
                id
            }
            None => {
                let mut edge = CodeEdge::new(kind);
                edge.properties = attrs;
                graph.add_edge(from, to, edge)
            }
        }
    }

    /// Number of edges, optionally restricted to one task
    pub fn edge_count(&self, task: Option<&str>) -> usize {
        let graph = self.read_graph();
        match task {
            Some(t) => graph
                .edge_references()
                .filter(|e| graph.node_weight(e.source()).map_or(false, |n| n.task == t))
                .count(),
            None => graph.edge_count(),
        }
    }

    /// Outgoing `kind` edges of a node, in insertion order
    pub fn outgoing(&self, task: &str, full_name: &str, kind: EdgeKind) -> Vec<(CodeEdge, CodeNode)> {
        let graph = self.read_graph();
        let index = self.read_index();

        let Some(&idx) = index.get(&key(task, full_name)) else {
            return vec![];
        };

        let mut out: Vec<_> = graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().kind == kind)
            .filter_map(|e| {
                let target = graph.node_weight(e.target())?;
                Some((e.id(), e.weight().clone(), target.clone()))
            })
            .collect();
        out.sort_by_key(|(id, _, _)| *id);
        out.into_iter().map(|(_, edge, node)| (edge, node)).collect()
    }

    // ==================== Queries ====================

    /// Match a node or one-hop path pattern
    pub fn query(&self, pattern: &Pattern) -> Vec<Record> {
        let graph = self.read_graph();
        let index = self.read_index();

        // Exact full-name lookups avoid a scan
        let starts: Vec<NodeIndex> = match pattern.start.full_name.as_deref() {
            Some(fq) => index.get(&key(&pattern.task, fq)).copied().into_iter().collect(),
            None => graph.node_indices().collect(),
        };

        let mut records = Vec::new();
        for idx in starts {
            let Some(node) = graph.node_weight(idx) else {
                continue;
            };
            if node.task != pattern.task || !pattern.start.matches(node) {
                continue;
            }

            let Some(kind) = pattern.edge else {
                records.push(Record {
                    start: node.clone(),
                    edge: None,
                    end: None,
                });
                continue;
            };

            let mut edges: Vec<_> = graph
                .edges_directed(idx, Direction::Outgoing)
                .filter(|e| e.weight().kind == kind)
                .collect();
            edges.sort_by_key(|e| e.id());

            for e in edges {
                let Some(target) = graph.node_weight(e.target()) else {
                    continue;
                };
                if pattern.end.matches(target) {
                    records.push(Record {
                        start: node.clone(),
                        edge: Some(e.weight().clone()),
                        end: Some(target.clone()),
                    });
                }
            }
        }

        records
    }

    /// Node and edge counts by kind for one task
    pub fn stats(&self, task: &str) -> HashMap<String, usize> {
        let graph = self.read_graph();
        let mut stats = HashMap::new();
        let (mut nodes, mut edges) = (0, 0);

        for node in graph.node_weights().filter(|n| n.task == task) {
            *stats.entry(node.kind.as_str().to_string()).or_insert(0) += 1;
            nodes += 1;
        }
        for e in graph.edge_references() {
            let in_task = graph.node_weight(e.source()).map_or(false, |n| n.task == task);
            if in_task {
                *stats.entry(e.weight().kind.as_str().to_string()).or_insert(0) += 1;
                edges += 1;
            }
        }

        stats.insert("total_nodes".to_string(), nodes);
        stats.insert("total_edges".to_string(), edges);
        stats
    }

    // ==================== Task Management ====================

    /// Delete every node (and with them every edge) tagged with `task`.
    /// Returns the number of nodes removed.
    pub fn clear_task(&self, task: &str) -> usize {
        let mut graph = self.write_graph();
        let mut index = self.write_index();

        let before = graph.node_count();
        graph.retain_nodes(|g, idx| g[idx].task != task);
        let removed = before - graph.node_count();

        // Node removal swaps indices, so the lookup table is rebuilt
        index.clear();
        for idx in graph.node_indices() {
            let node = &graph[idx];
            index.insert(key(&node.task, &node.full_name), idx);
        }

        tracing::debug!("Cleared {} nodes for task '{}'", removed, task);
        removed
    }

    /// Copy a task's nodes and edges under a new tag, leaving out nodes that
    /// belong to `changed_files`. Returns the number of nodes copied.
    pub fn carry_over_task(&self, from: &str, to: &str, changed_files: &HashSet<String>) -> usize {
        let mut graph = self.write_graph();
        let mut index = self.write_index();

        let keep: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|&idx| {
                let node = &graph[idx];
                node.task == from
                    && node
                        .file_path()
                        .map_or(true, |path| !changed_files.contains(path))
            })
            .collect();

        let mut mapping = HashMap::new();
        for idx in &keep {
            let node = graph[*idx].clone();
            let new_idx = Self::upsert_node_locked(
                &mut graph,
                &mut index,
                to,
                node.kind,
                &node.full_name,
                node.properties,
            );
            mapping.insert(*idx, new_idx);
        }

        let edges: Vec<_> = graph
            .edge_references()
            .filter_map(|e| {
                let from = *mapping.get(&e.source())?;
                let to = *mapping.get(&e.target())?;
                Some((from, to, e.weight().clone()))
            })
            .collect();
        for (from, to, edge) in edges {
            let exists = graph
                .edges_connecting(from, to)
                .any(|e| e.weight().kind == edge.kind);
            if !exists {
                graph.add_edge(from, to, edge);
            }
        }

        keep.len()
    }

    // ==================== Persistence ====================

    /// Persist graph to redb
    pub fn save(&self) -> Result<()> {
        let db = match &self.db {
            Some(db) => db,
            None => return Ok(()),
        };

        let graph = self.read_graph();

        let write_txn = db.begin_write()?;
        // Rewrite from scratch so cleared tasks do not linger
        write_txn.delete_table(NODES_TABLE)?;
        write_txn.delete_table(EDGES_TABLE)?;
        {
            let mut table = write_txn.open_table(NODES_TABLE)?;

            for node in graph.node_weights() {
                let key = format!("node:{}:{}", node.task, node.full_name);
                let value = serde_json::to_vec(node)?;
                table.insert(key.as_str(), value.as_slice())?;
            }

            // Edges are stored as a single entry
            let edges: Vec<_> = graph
                .edge_references()
                .filter_map(|e| {
                    let src = graph.node_weight(e.source())?;
                    let dst = graph.node_weight(e.target())?;
                    Some((
                        src.task.clone(),
                        src.full_name.clone(),
                        dst.full_name.clone(),
                        e.weight().clone(),
                    ))
                })
                .collect();

            let edges_data = serde_json::to_vec(&edges)?;

            let mut edges_table = write_txn.open_table(EDGES_TABLE)?;
            edges_table.insert("__edges__", edges_data.as_slice())?;
        }
        write_txn.commit()?;

        Ok(())
    }

    /// Load graph from redb
    fn load(&self) -> Result<()> {
        let db = match &self.db {
            Some(db) => db,
            None => return Ok(()),
        };

        let read_txn = db.begin_read()?;

        // Missing tables mean a fresh database
        let nodes_table = match read_txn.open_table(NODES_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut graph = self.write_graph();
        let mut index = self.write_index();

        for item in nodes_table.range::<&str>(..)? {
            let (key_guard, value) = item?;
            if key_guard.value().starts_with("node:") {
                let node: CodeNode = serde_json::from_slice(value.value())?;
                let node_key = key(&node.task, &node.full_name);
                let idx = graph.add_node(node);
                index.insert(node_key, idx);
            }
        }

        let edges_table = match read_txn.open_table(EDGES_TABLE) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if let Some(edges_entry) = edges_table.get("__edges__")? {
            let edges: Vec<(String, String, String, CodeEdge)> =
                serde_json::from_slice(edges_entry.value())?;
            for (task, src, dst, edge) in edges {
                if let (Some(&from), Some(&to)) =
                    (index.get(&key(&task, &src)), index.get(&key(&task, &dst)))
                {
                    graph.add_edge(from, to, edge);
                }
            }
        }

        tracing::debug!(
            "Loaded {} nodes and {} edges from graph store",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(())
    }
}
