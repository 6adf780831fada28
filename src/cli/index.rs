//! `index` command: build the task's graph from the repository

use super::Workspace;
use anyhow::{bail, Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use repograph::error::ReferenceKind;
use repograph::graph::{GraphBackend, GraphStore};
use repograph::index::{collect_python_files, IndexReport, IndexSession, LockRegistry};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn spinner(message: &str) -> ProgressBar {
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn run(ws: &Workspace, file: Option<&Path>, clear: bool) -> Result<()> {
    let store = Arc::new(ws.open_store()?);
    if clear {
        let removed = store.clear_task(&ws.task);
        info!("Cleared {} nodes of task '{}'", removed, ws.task);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ws.workers)
        .build()
        .context("Failed to build worker pool")?;

    let locks = LockRegistry::new();
    let backend: Arc<dyn GraphBackend> = store.clone();
    let session = IndexSession::new(&ws.repo_path, backend, &ws.task, &locks);

    let report = match file {
        Some(file) => {
            let target = ws.repo_path.join(file);
            let target = target
                .canonicalize()
                .with_context(|| format!("File does not exist: {}", target.display()))?;
            let pb = (!ws.json).then(|| spinner(&format!("Indexing {}...", ws.relative(&target).display())));
            let report = pool.install(|| session.run_single(&target));
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            report
        }
        None => {
            let files = collect_python_files(&ws.repo_path, &ws.config);
            let pb = (!ws.json).then(|| spinner(&format!("Indexing {} Python files...", files.len())));
            let report = pool.install(|| session.run(&files));
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            report
        }
    };

    store.save().context("Failed to save graph store")?;

    if ws.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(ws, &store, &report);
    }

    if !report.writer_failures.is_empty() {
        bail!(
            "{} writer(s) could not acquire the store lock for task '{}'",
            report.writer_failures.len(),
            ws.task
        );
    }
    Ok(())
}

fn print_summary(ws: &Workspace, store: &GraphStore, report: &IndexReport) {
    println!(
        "{} Indexed {}/{} files into task {} in {:.2}s",
        style("✓").green().bold(),
        style(report.files_indexed).bold(),
        report.files_discovered,
        style(&ws.task).cyan(),
        report.elapsed_ms as f64 / 1000.0
    );
    println!(
        "  {} nodes, {} edges, {} classes, {} inherited methods",
        store.node_count(Some(&ws.task)),
        store.edge_count(Some(&ws.task)),
        report.classes,
        report.propagated_pairs
    );

    let unresolved = [ReferenceKind::Import, ReferenceKind::Base, ReferenceKind::Call]
        .map(|kind| (kind, report.unresolved(kind)));
    if unresolved.iter().any(|(_, n)| *n > 0) {
        let parts: Vec<String> = unresolved
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(kind, n)| format!("{} {}", n, kind))
            .collect();
        println!("  {} unresolved: {}", style("·").dim(), parts.join(", "));
    }

    if !report.parse_failures.is_empty() {
        println!(
            "{} {} file(s) skipped:",
            style("!").yellow().bold(),
            report.parse_failures.len()
        );
        for failure in &report.parse_failures {
            println!("  {} {}", style(&failure.subject).dim(), failure.error);
        }
    }
    for failure in &report.writer_failures {
        eprintln!("{} {}: {}", style("✗").red().bold(), failure.subject, failure.error);
    }
}
