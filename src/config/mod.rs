//! Configuration module for repograph
//!
//! This module handles:
//! - Project-level configuration (repograph.toml)
//! - Path exclusion patterns
//! - Search display and fuzzy-matching defaults

mod project_config;

pub use project_config::{
    glob_match, load_project_config, IndexConfig, ProjectConfig, SearchConfig, StoreConfig,
    DEFAULT_EXCLUDE_PATTERNS,
};
