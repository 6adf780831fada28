//! CLI command definitions and handlers

mod graph;
mod index;
mod search;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repograph::config::{load_project_config, ProjectConfig};
use repograph::graph::GraphStore;
use std::path::{Path, PathBuf};

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// repograph - code knowledge graph for Python repositories
#[derive(Parser, Debug)]
#[command(name = "repograph")]
#[command(
    version,
    about = "Build a code knowledge graph of a Python repository and search it",
    long_about = "repograph indexes a Python codebase into a graph of modules, classes, \
functions, methods, fields and globals, linked by containment, inheritance, calls and \
usage, and answers structured lookups over it.",
    after_help = "\
Examples:
  repograph . index                       Index the current directory
  repograph . index --file pkg/mod.py     Index one file and what it imports
  repograph . class Foo                   Show every class named Foo
  repograph . method save --class Model   Find a method, following inheritance
  repograph . path pkg.mod.Cls.method     Resolve a dotted name
  repograph . neighbors pkg.mod.run --depth 2
  repograph . stats --task main"
)]
pub struct Cli {
    /// Path to repository (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Task tag isolating this run's nodes and edges
    #[arg(long, global = true, env = "REPOGRAPH_TASK")]
    pub task: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index the repository (or one file) into the graph store
    Index {
        /// Index only this file plus the modules it pulls in
        #[arg(long)]
        file: Option<PathBuf>,

        /// Drop the task's existing nodes and edges first
        #[arg(long)]
        clear: bool,
    },

    /// Find classes by name
    Class {
        name: String,

        /// Only in files whose path ends with this
        #[arg(long)]
        file: Option<String>,

        /// Show full class bodies instead of signatures
        #[arg(long)]
        full: bool,
    },

    /// Find methods or functions by name
    Method {
        name: String,

        /// Resolve through this class and its ancestors
        #[arg(long)]
        class: Option<String>,

        /// Only in files whose path ends with this
        #[arg(long)]
        file: Option<String>,
    },

    /// Find code containing a snippet
    Code {
        snippet: String,

        #[arg(long)]
        file: Option<String>,
    },

    /// Resolve a dotted name such as pkg.mod.Cls.method
    Path {
        dotted: String,

        /// Call-graph depth for related edges (default from config)
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Callees of a symbol up to N hops in the call graph
    Neighbors {
        anchor: String,

        #[arg(long)]
        depth: Option<usize>,
    },

    /// Print lines START..=END of a file
    Snippet {
        file: PathBuf,
        start: usize,
        end: usize,
    },

    /// Node and edge counts by kind for the task
    Stats,

    /// Delete every node and edge of the task
    Clear,

    /// Copy one task's graph to a new task tag, leaving out changed files
    CarryOver {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        /// Repository-relative path of a changed file (repeatable)
        #[arg(long)]
        changed: Vec<String>,
    },
}

/// Repository, config and effective settings shared by all handlers
pub(crate) struct Workspace {
    pub repo_path: PathBuf,
    pub config: ProjectConfig,
    pub task: String,
    pub workers: usize,
    pub json: bool,
}

impl Workspace {
    fn open(cli: &Cli) -> Result<Self> {
        let repo_path = cli
            .path
            .canonicalize()
            .with_context(|| format!("Path does not exist: {}", cli.path.display()))?;
        let config = load_project_config(&repo_path);

        let task = cli.task.clone().unwrap_or_else(|| config.index.task.clone());
        let workers = cli
            .workers
            .or(config.index.workers)
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(4, |n| n.get()))
            .clamp(1, 64);

        Ok(Self {
            repo_path,
            config,
            task,
            workers,
            json: cli.json,
        })
    }

    pub fn store_path(&self) -> PathBuf {
        self.config.store_path(&self.repo_path)
    }

    pub fn open_store(&self) -> Result<GraphStore> {
        let path = self.store_path();
        GraphStore::new(&path)
            .with_context(|| format!("Failed to open graph store at {}", path.display()))
    }

    /// Store that must already hold an index
    pub fn existing_store(&self) -> Result<GraphStore> {
        if !self.store_path().exists() {
            anyhow::bail!(
                "No graph found for {}. Run {} first.",
                self.repo_path.display(),
                console::style("repograph index").cyan()
            );
        }
        self.open_store()
    }

    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.repo_path).unwrap_or(path)
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let ws = Workspace::open(&cli)?;

    match cli.command {
        Commands::Index { file, clear } => index::run(&ws, file.as_deref(), clear),

        Commands::Class { name, file, full } => search::class(&ws, &name, file.as_deref(), full),

        Commands::Method { name, class, file } => {
            search::method(&ws, &name, class.as_deref(), file.as_deref())
        }

        Commands::Code { snippet, file } => search::code(&ws, &snippet, file.as_deref()),

        Commands::Path { dotted, depth } => search::dotted_path(&ws, &dotted, depth),

        Commands::Neighbors { anchor, depth } => search::neighbors(&ws, &anchor, depth),

        Commands::Snippet { file, start, end } => search::snippet(&ws, &file, start, end),

        Commands::Stats => graph::stats(&ws),

        Commands::Clear => graph::clear(&ws),

        Commands::CarryOver { from, to, changed } => graph::carry_over(&ws, &from, &to, &changed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers("8"), Ok(8));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "repograph", "/repo", "method", "save", "--class", "Model", "--task", "v2", "--json",
        ])
        .unwrap();
        assert_eq!(cli.path, PathBuf::from("/repo"));
        assert_eq!(cli.task.as_deref(), Some("v2"));
        assert!(cli.json);
        match cli.command {
            Commands::Method { name, class, file } => {
                assert_eq!(name, "save");
                assert_eq!(class.as_deref(), Some("Model"));
                assert!(file.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_carry_over_collects_changed_files() {
        let cli = Cli::try_parse_from([
            "repograph", "carry-over", "--from", "v1", "--to", "v2", "--changed", "a.py", "--changed", "b/c.py",
        ])
        .unwrap();
        match cli.command {
            Commands::CarryOver { from, to, changed } => {
                assert_eq!((from.as_str(), to.as_str()), ("v1", "v2"));
                assert_eq!(changed, vec!["a.py".to_string(), "b/c.py".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
