//! Indexing: turning parsed files into graph nodes and edges
//!
//! - `mutator`: per-task serialized, idempotent writes
//! - `resolver`: name lookup with on-demand indexing of module files
//! - `inheritance`: base-class edges and inherited method propagation
//! - `session`: one parallel run over a set of files
//! - `files`: source discovery

pub mod files;
pub mod inheritance;
pub mod mutator;
pub mod resolver;
pub mod session;

pub use files::collect_python_files;
pub use inheritance::{is_constructor, resolve_method, ClassHierarchy, InheritanceEngine, CONSTRUCTORS};
pub use mutator::{GraphMutator, LockRegistry};
pub use resolver::{ModuleIndexer, NameResolver, ReferenceResolver, Resolved, VisitedFiles};
pub use session::{Failure, IndexReport, IndexSession};
