//! repograph - code knowledge graph for Python repositories
//!
//! Indexes a Python codebase into a task-scoped graph of modules, classes,
//! functions, methods, fields and globals, resolves imports and inheritance
//! across files, and serves structured searches over the result.

pub mod cache;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod models;
pub mod parsers;
pub mod search;

pub use error::{Diagnostic, IndexError, IndexResult, ReferenceKind};
pub use graph::{CallGraph, GraphStore};
pub use index::{IndexReport, IndexSession, LockRegistry};
pub use search::{SearchEngine, SearchIndex, SearchOutcome};
