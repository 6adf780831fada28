//! Task-level graph commands: stats, clear, carry-over

use super::Workspace;
use anyhow::{Context, Result};
use console::style;
use std::collections::{BTreeMap, HashSet};

/// Print node and edge counts by kind for the task
pub fn stats(ws: &Workspace) -> Result<()> {
    let store = ws.existing_store()?;
    let stats: BTreeMap<String, usize> = store.stats(&ws.task).into_iter().collect();

    if ws.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("\n{} Graph for task {}\n", style("📊").bold(), style(&ws.task).cyan());
    for (kind, count) in stats.iter().filter(|(k, _)| !k.starts_with("total_")) {
        println!("  {:<20} {}", kind, count);
    }
    println!(
        "\n  {} nodes, {} edges",
        style(stats.get("total_nodes").copied().unwrap_or(0)).bold(),
        style(stats.get("total_edges").copied().unwrap_or(0)).bold()
    );
    Ok(())
}

pub fn clear(ws: &Workspace) -> Result<()> {
    let store = ws.existing_store()?;
    let removed = store.clear_task(&ws.task);
    store.save().context("Failed to save graph store")?;

    if ws.json {
        println!("{}", serde_json::json!({ "task": ws.task, "removed_nodes": removed }));
    } else {
        println!(
            "{} Removed {} nodes of task {}",
            style("✓").green().bold(),
            removed,
            style(&ws.task).cyan()
        );
    }
    Ok(())
}

/// Copy `from` to `to`, leaving out nodes of the changed files
pub fn carry_over(ws: &Workspace, from: &str, to: &str, changed: &[String]) -> Result<()> {
    let store = ws.existing_store()?;
    let changed: HashSet<String> = changed
        .iter()
        .map(|f| f.trim_start_matches("./").replace('\\', "/"))
        .collect();

    let copied = store.carry_over_task(from, to, &changed);
    store.save().context("Failed to save graph store")?;

    if ws.json {
        println!(
            "{}",
            serde_json::json!({ "from": from, "to": to, "copied_nodes": copied, "changed_files": changed.len() })
        );
    } else {
        println!(
            "{} Carried {} nodes from {} to {} ({} changed files left out)",
            style("✓").green().bold(),
            copied,
            style(from).cyan(),
            style(to).cyan(),
            changed.len()
        );
    }
    Ok(())
}
