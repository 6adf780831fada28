//! End-to-end tests over the public library API
//!
//! Each test writes a small Python project into its own temp directory,
//! indexes it into a fresh store and checks the resulting graph.

use repograph::config::ProjectConfig;
use repograph::graph::{EdgeKind, GraphStore, NodeKind, NodeMatch, Pattern};
use repograph::index::{collect_python_files, GraphMutator, IndexReport, IndexSession, LockRegistry};
use repograph::search::{SearchEngine, SearchIndex};
use repograph::CallGraph;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const TASK: &str = "it";

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for (rel, source) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, source).unwrap();
    }
    dir
}

fn index(root: &Path, store: &Arc<GraphStore>) -> IndexReport {
    let files = collect_python_files(root, &ProjectConfig::default());
    IndexSession::new(root, store.clone(), TASK, &LockRegistry::new()).run(&files)
}

fn targets(store: &GraphStore, start: &str, kind: EdgeKind) -> Vec<String> {
    let mut names: Vec<String> = store
        .outgoing(TASK, start, kind)
        .into_iter()
        .map(|(_, n)| n.full_name)
        .collect();
    names.sort();
    names
}

const CHAIN: &[(&str, &str)] = &[
    (
        "shapes/base.py",
        "class A:\n    def __init__(self):\n        self.ready = True\n\n    def area(self):\n        return 0\n",
    ),
    ("shapes/mid.py", "from .base import A\n\nclass B(A):\n    def scale(self):\n        return self.area()\n"),
    ("shapes/leaf.py", "from shapes.mid import B\n\nclass C(B):\n    pass\n"),
];

type NodeRow = (String, NodeKind, BTreeMap<String, serde_json::Value>);
type EdgeRow = (String, EdgeKind, String, BTreeMap<String, serde_json::Value>);

/// Every node and edge of the task with its attributes, in a stable order
fn snapshot(store: &GraphStore) -> (Vec<NodeRow>, Vec<EdgeRow>) {
    let mut nodes: Vec<NodeRow> = store
        .query(&Pattern::node(TASK, NodeMatch::any()))
        .into_iter()
        .map(|r| (r.start.full_name, r.start.kind, r.start.properties.into_iter().collect()))
        .collect();
    nodes.sort_by(|a, b| a.0.cmp(&b.0));

    let kinds = [
        EdgeKind::Contains,
        EdgeKind::Inherits,
        EdgeKind::HasMethod,
        EdgeKind::HasField,
        EdgeKind::Calls,
        EdgeKind::Uses,
    ];
    let mut edges: Vec<EdgeRow> = kinds
        .iter()
        .flat_map(|&kind| store.query(&Pattern::path(TASK, NodeMatch::any(), kind, NodeMatch::any())))
        .filter_map(|r| {
            let edge = r.edge?;
            let end = r.end?;
            Some((r.start.full_name, edge.kind, end.full_name, edge.properties.into_iter().collect()))
        })
        .collect();
    edges.sort_by(|a, b| (&a.0, a.1.as_str(), &a.2).cmp(&(&b.0, b.1.as_str(), &b.2)));

    (nodes, edges)
}

#[test]
fn test_reindexing_is_idempotent() {
    let dir = project(CHAIN);
    let store = Arc::new(GraphStore::in_memory());

    let first = index(dir.path(), &store);
    assert!(first.parse_failures.is_empty());
    assert_eq!(first.files_indexed, 3);
    let (nodes, edges) = snapshot(&store);
    assert_eq!(nodes.len(), store.node_count(Some(TASK)));
    assert_eq!(edges.len(), store.edge_count(Some(TASK)));

    index(dir.path(), &store);
    let (nodes_again, edges_again) = snapshot(&store);
    assert_eq!(nodes_again, nodes);
    assert_eq!(edges_again, edges);
}

#[test]
fn test_methods_propagate_down_the_chain() {
    let dir = project(CHAIN);
    let store = Arc::new(GraphStore::in_memory());
    let locks = LockRegistry::new();
    let files = collect_python_files(dir.path(), &ProjectConfig::default());
    let session = IndexSession::new(dir.path(), store.clone(), TASK, &locks);
    let report = session.run(&files);

    assert!(report.propagated_pairs >= 3);
    assert_eq!(targets(&store, "shapes.leaf.C", EdgeKind::Inherits), vec!["shapes.mid.B"]);

    let c_methods = targets(&store, "shapes.leaf.C", EdgeKind::HasMethod);
    assert!(c_methods.contains(&"shapes.base.A.area".to_string()));
    assert!(c_methods.contains(&"shapes.mid.B.scale".to_string()));
    // Constructors stay with their class
    assert!(!c_methods.iter().any(|m| m.ends_with("__init__")));
    assert!(targets(&store, "shapes.base.A", EdgeKind::HasMethod).contains(&"shapes.base.A.__init__".to_string()));

    assert_eq!(session.resolve_method("shapes.leaf.C", "area").as_deref(), Some("shapes.base.A"));
    assert_eq!(session.resolve_method("shapes.leaf.C", "scale").as_deref(), Some("shapes.mid.B"));
    assert_eq!(session.resolve_method("shapes.leaf.C", "__init__"), None);
    assert!(targets(&store, "shapes.mid.B.scale", EdgeKind::Calls).contains(&"shapes.base.A.area".to_string()));

    // A repeated propagation request is a no-op
    let mutator = GraphMutator::new(store.clone(), TASK, &locks);
    let edges = store.edge_count(Some(TASK));
    assert_eq!(session.inheritance().propagate_methods("shapes.leaf.C", &mutator).unwrap(), 0);
    assert_eq!(store.edge_count(Some(TASK)), edges);
}

#[test]
fn test_method_resolution_follows_base_declaration_order() {
    let dir = project(&[
        (
            "diamond/base.py",
            "class A:\n    def __init__(self):\n        pass\n\n    def m(self):\n        return 'a'\n",
        ),
        (
            "diamond/left.py",
            "from diamond.base import A\n\nclass B1(A):\n    def m(self):\n        return 'b1'\n",
        ),
        (
            "diamond/right.py",
            "from diamond.base import A\n\nclass B2(A):\n    def m(self):\n        return 'b2'\n\n    def only_b2(self):\n        return 2\n",
        ),
        (
            "diamond/leaf.py",
            "from diamond.left import B1\nfrom diamond.right import B2\n\nclass C(B1, B2):\n    def run(self):\n        return self.m()\n",
        ),
    ]);
    let store = Arc::new(GraphStore::in_memory());
    let files = collect_python_files(dir.path(), &ProjectConfig::default());
    let session = IndexSession::new(dir.path(), store.clone(), TASK, &LockRegistry::new());
    let report = session.run(&files);
    assert!(report.writer_failures.is_empty());

    let bases: Vec<(String, Option<i64>)> = store
        .outgoing(TASK, "diamond.leaf.C", EdgeKind::Inherits)
        .into_iter()
        .map(|(edge, node)| (node.full_name, edge.properties.get("order").and_then(|v| v.as_i64())))
        .collect();
    assert_eq!(
        bases,
        vec![
            ("diamond.left.B1".to_string(), Some(0)),
            ("diamond.right.B2".to_string(), Some(1)),
        ]
    );

    // The first declared base wins over the second
    assert_eq!(session.resolve_method("diamond.leaf.C", "m").as_deref(), Some("diamond.left.B1"));
    assert_eq!(session.resolve_method("diamond.leaf.C", "only_b2").as_deref(), Some("diamond.right.B2"));
    assert_eq!(session.resolve_method("diamond.leaf.C", "run").as_deref(), Some("diamond.leaf.C"));
    assert_eq!(session.resolve_method("diamond.leaf.C", "__init__"), None);
    assert_eq!(session.resolve_method("diamond.base.A", "__init__").as_deref(), Some("diamond.base.A"));

    let calls = targets(&store, "diamond.leaf.C.run", EdgeKind::Calls);
    assert_eq!(calls, vec!["diamond.left.B1.m"]);
}

#[test]
fn test_import_cycle_between_packages_terminates() {
    let dir = project(&[
        ("pkg1/__init__.py", "from pkg2 import Two\n\nclass One:\n    pass\n"),
        ("pkg2/__init__.py", "from pkg1 import One\n\nclass Two(One):\n    pass\n"),
    ]);
    let store = Arc::new(GraphStore::in_memory());
    let report = index(dir.path(), &store);

    assert!(report.writer_failures.is_empty());
    assert_eq!(report.files_indexed, 2);
    assert!(store.get_node(TASK, "pkg1.One").is_some());
    assert_eq!(targets(&store, "pkg2.Two", EdgeKind::Inherits), vec!["pkg1.One"]);
}

#[test]
fn test_relative_imports_resolve_against_package() {
    let dir = project(&[
        ("app/models/user.py", "class User:\n    def save(self):\n        pass\n"),
        ("app/models/__init__.py", "from .user import User\n"),
        (
            "app/views/profile.py",
            "from ..models import User\n\ndef show():\n    u = User()\n    return u\n",
        ),
    ]);
    let store = Arc::new(GraphStore::in_memory());
    let report = index(dir.path(), &store);

    assert!(report.parse_failures.is_empty());
    assert!(targets(&store, "app.views.profile", EdgeKind::Contains).contains(&"app.models.user.User".to_string()));
    assert!(targets(&store, "app.views.profile.show", EdgeKind::Calls).contains(&"app.models.user.User".to_string()));
}

#[test]
fn test_store_round_trips_through_disk() {
    let dir = project(CHAIN);
    let db = tempfile::tempdir().unwrap();
    let db_path = db.path().join("graph_db");

    let (nodes, edges) = {
        let store = Arc::new(GraphStore::new(&db_path).unwrap());
        index(dir.path(), &store);
        store.save().unwrap();
        (store.node_count(Some(TASK)), store.edge_count(Some(TASK)))
    };

    let reopened = GraphStore::new(&db_path).unwrap();
    assert_eq!(reopened.node_count(Some(TASK)), nodes);
    assert_eq!(reopened.edge_count(Some(TASK)), edges);
    let class = reopened.get_node(TASK, "shapes.mid.B").expect("class survives reload");
    assert_eq!(class.kind, NodeKind::Class);
    assert_eq!(class.file_path(), Some("shapes/mid.py"));
}

#[test]
fn test_carry_over_leaves_out_changed_files() {
    let dir = project(CHAIN);
    let store = Arc::new(GraphStore::in_memory());
    index(dir.path(), &store);

    let changed: HashSet<String> = ["shapes/leaf.py".to_string()].into_iter().collect();
    let copied = store.carry_over_task(TASK, "next", &changed);

    assert!(copied > 0);
    assert!(store.get_node("next", "shapes.mid.B").is_some());
    assert!(store.get_node("next", "shapes.leaf.C").is_none());
    assert!(store.get_node(TASK, "shapes.leaf.C").is_some());

    assert!(store.clear_task("next") > 0);
    assert_eq!(store.node_count(Some("next")), 0);
}

#[test]
fn test_search_over_indexed_project() {
    let dir = project(&[
        ("svc/core.py", "class Service:\n    def start(self):\n        return boot()\n\ndef boot():\n    return 1\n"),
        ("svc/ext.py", "from svc.core import Service\n\nclass Worker(Service):\n    pass\n"),
    ]);
    let store = Arc::new(GraphStore::in_memory());
    index(dir.path(), &store);

    let config = ProjectConfig::default();
    let engine = SearchEngine::new(SearchIndex::from_project(dir.path(), &config), config.search);
    let calls = CallGraph::from_backend(store.as_ref(), TASK);
    assert!(calls.contains("svc.core.Service.start"));

    let inherited = engine.find_method_in_class("start", "Worker");
    assert!(inherited.found);
    assert!(inherited.text.contains("<class>Service</class> <func>start</func>"));

    let path = engine.resolve_dotted_path("svc.core.Service.start", &calls, 1);
    assert!(path.found);
    assert_eq!(path.edges, vec!["svc.core.Service.start -> svc.core.boot".to_string()]);

    let near = engine.call_graph_neighbors("svc.core.Service.start", &calls, 1);
    assert_eq!(near.nodes, vec!["svc.core.boot"]);
}
