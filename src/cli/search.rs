//! Search commands: class, method, code, path, neighbors, snippet

use super::Workspace;
use anyhow::Result;
use console::style;
use repograph::graph::CallGraph;
use repograph::search::{SearchEngine, SearchIndex, SearchOutcome};
use std::path::Path;
use tracing::{debug, warn};

fn engine(ws: &Workspace) -> SearchEngine {
    let index = SearchIndex::from_project(&ws.repo_path, &ws.config);
    SearchEngine::new(index, ws.config.search)
}

/// Call graph of the task's CALLS edges; empty when nothing is indexed yet
fn call_graph(ws: &Workspace) -> Result<CallGraph> {
    if !ws.store_path().exists() {
        warn!(
            "No graph store at {}; call-graph results will be empty",
            ws.store_path().display()
        );
        return Ok(CallGraph::new());
    }
    let store = ws.open_store()?;
    let graph = CallGraph::from_backend(&store, &ws.task);
    debug!(
        "Call graph for task '{}': {} nodes, {} edges",
        ws.task,
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

fn print_outcome(ws: &Workspace, outcome: &SearchOutcome) -> Result<()> {
    if ws.json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    if outcome.found {
        println!("{}", outcome.text);
    } else {
        println!("{} {}", style("✗").yellow(), outcome.text);
    }
    if !outcome.edges.is_empty() {
        println!("\n{}", style("Call graph:").bold());
        for edge in &outcome.edges {
            println!("  {}", edge);
        }
    }
    if !outcome.suggestions.is_empty() {
        println!("\n{}", style("Did you mean:").bold());
        for s in &outcome.suggestions {
            println!("  {} {}", s.name, style(format!("({})", s.score)).dim());
        }
    }
    Ok(())
}

pub fn class(ws: &Workspace, name: &str, file: Option<&str>, full: bool) -> Result<()> {
    let engine = engine(ws);
    let outcome = match (file, full) {
        (Some(file), _) => engine.find_class_in_file(name, file),
        (None, true) => engine.class_full_snippet(name),
        (None, false) => engine.find_class(name),
    };
    print_outcome(ws, &outcome)
}

pub fn method(ws: &Workspace, name: &str, class: Option<&str>, file: Option<&str>) -> Result<()> {
    let engine = engine(ws);
    let outcome = match (class, file) {
        (Some(class), _) => engine.find_method_in_class(name, class),
        (None, Some(file)) => engine.find_method_in_file(name, file),
        (None, None) => engine.find_method(name),
    };
    print_outcome(ws, &outcome)
}

pub fn code(ws: &Workspace, snippet: &str, file: Option<&str>) -> Result<()> {
    let outcome = engine(ws).find_code(snippet, file);
    print_outcome(ws, &outcome)
}

pub fn dotted_path(ws: &Workspace, dotted: &str, depth: Option<usize>) -> Result<()> {
    let graph = call_graph(ws)?;
    let depth = depth.unwrap_or(ws.config.search.default_depth);
    let outcome = engine(ws).resolve_dotted_path(dotted, &graph, depth);
    print_outcome(ws, &outcome)
}

pub fn neighbors(ws: &Workspace, anchor: &str, depth: Option<usize>) -> Result<()> {
    let graph = call_graph(ws)?;
    let depth = depth.unwrap_or(ws.config.search.default_depth);
    let outcome = engine(ws).call_graph_neighbors(anchor, &graph, depth);
    print_outcome(ws, &outcome)
}

/// Reads straight from disk; no project scan needed
pub fn snippet(ws: &Workspace, file: &Path, start: usize, end: usize) -> Result<()> {
    let engine = SearchEngine::new(SearchIndex::new(&ws.repo_path), ws.config.search);
    let outcome = engine.retrieve_code_snippet(file, start, end);
    print_outcome(ws, &outcome)
}
