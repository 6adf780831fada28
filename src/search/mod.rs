//! Structured code search
//!
//! Lookups by class, method, code substring, dotted path and call-graph
//! neighbourhood, with display limits and fuzzy fallbacks.

pub mod engine;
pub mod fuzzy;
pub mod index;
pub mod result;

pub use engine::{is_class_name, SearchEngine, OBJECT_MEMBERS};
pub use fuzzy::{rank_similar, LevenshteinRatio, SimilarityRanker, Suggestion};
pub use index::SearchIndex;
pub use result::{SearchOutcome, SearchResult};
