//! Code graph storage
//!
//! Pure Rust implementation using petgraph + redb, plus the lightweight call
//! graph used for neighbourhood queries.

pub mod call_graph;
pub mod pattern;
pub mod store;
pub mod store_models;
pub mod store_query;
pub mod traits;

pub use call_graph::CallGraph;
pub use pattern::{NodeMatch, Pattern, Record};
pub use store::GraphStore;
pub use store_models::{Attrs, CodeEdge, CodeNode, EdgeKind, NodeKind};
pub use traits::{EdgeRef, GraphBackend, NodeRef};
