//! Project-level configuration support
//!
//! Loads per-project configuration from `repograph.toml` or
//! `.repographrc.json` in the repository root.
//!
//! # Configuration Format
//!
//! ```toml
//! # repograph.toml
//!
//! [index]
//! task = "main"
//! workers = 8
//! exclude = ["generated/", "**/migrations/**"]
//!
//! [search]
//! show_limit = 3
//! fuzzy_threshold = 70
//! fuzzy_limit = 5
//! default_depth = 1
//!
//! [store]
//! path = ".repograph/graph_db"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Built-in exclusion patterns for caches, virtualenvs and vendored code.
/// Applied unless `skip_default_excludes = true`.
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "**/.git/**",
    "**/__pycache__/**",
    "**/.venv/**",
    "**/venv/**",
    "**/node_modules/**",
    "**/site-packages/**",
    "**/.tox/**",
];

/// Project-level configuration loaded from repograph.toml or similar
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Task tag written to every node and edge (default: "default")
    #[serde(default = "default_task")]
    pub task: String,

    /// Worker threads; falls back to the CPU count
    #[serde(default)]
    pub workers: Option<usize>,

    /// Paths/patterns to exclude from indexing
    #[serde(default)]
    pub exclude: Vec<String>,

    /// If true, disable built-in default exclusion patterns
    #[serde(default)]
    pub skip_default_excludes: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            task: default_task(),
            workers: None,
            exclude: Vec::new(),
            skip_default_excludes: false,
        }
    }
}

fn default_task() -> String {
    "default".to_string()
}

impl IndexConfig {
    /// Returns effective exclusion patterns (defaults + user patterns).
    /// If `skip_default_excludes` is true, only user patterns are returned.
    pub fn effective_patterns(&self) -> Vec<String> {
        let mut patterns = Vec::new();

        if !self.skip_default_excludes {
            patterns.extend(DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()));
        }

        for p in &self.exclude {
            if !patterns.contains(p) {
                patterns.push(p.clone());
            }
        }

        patterns
    }
}

/// Display and fuzzy-matching knobs for search
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SearchConfig {
    /// Above this many matches, results collapse to file names (default: 3)
    #[serde(default = "default_show_limit")]
    pub show_limit: usize,

    /// Minimum similarity score (0-100) for suggestions (default: 70)
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: u8,

    /// Maximum number of suggestions (default: 5)
    #[serde(default = "default_fuzzy_limit")]
    pub fuzzy_limit: usize,

    /// Neighbourhood depth for call-graph queries (default: 1)
    #[serde(default = "default_depth")]
    pub default_depth: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            show_limit: default_show_limit(),
            fuzzy_threshold: default_fuzzy_threshold(),
            fuzzy_limit: default_fuzzy_limit(),
            default_depth: default_depth(),
        }
    }
}

fn default_show_limit() -> usize {
    3
}
fn default_fuzzy_threshold() -> u8 {
    70
}
fn default_fuzzy_limit() -> usize {
    5
}
fn default_depth() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StoreConfig {
    /// Graph store directory; relative paths are taken from the repository root
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Load project configuration from the repository root.
///
/// Searches for configuration files in this order:
/// 1. `repograph.toml`
/// 2. `.repographrc.json`
///
/// Returns default configuration if no config file is found.
pub fn load_project_config(repo_path: &Path) -> ProjectConfig {
    let toml_path = repo_path.join("repograph.toml");
    if toml_path.exists() {
        match load_toml_config(&toml_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", toml_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", toml_path.display(), e);
            }
        }
    }

    let json_path = repo_path.join(".repographrc.json");
    if json_path.exists() {
        match load_json_config(&json_path) {
            Ok(config) => {
                debug!("Loaded project config from {}", json_path.display());
                return config;
            }
            Err(e) => {
                warn!("Failed to load {}: {}", json_path.display(), e);
            }
        }
    }

    debug!("No project config found, using defaults");
    ProjectConfig::default()
}

fn load_toml_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = toml::from_str(&content)?;
    Ok(config)
}

fn load_json_config(path: &Path) -> anyhow::Result<ProjectConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ProjectConfig = serde_json::from_str(&content)?;
    Ok(config)
}

impl ProjectConfig {
    /// Check if a path (relative to the repository root) should be excluded
    pub fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        self.index
            .effective_patterns()
            .iter()
            .any(|pattern| glob_match(pattern, &path_str))
    }

    /// Graph store directory for a repository.
    ///
    /// `[store].path` wins (relative paths hang off the repository root);
    /// otherwise stores live in the user cache dir, one per repository.
    pub fn store_path(&self, repo_path: &Path) -> PathBuf {
        match &self.store.path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => repo_path.join(p),
            None => default_store_root().join(repo_key(repo_path)).join("graph_db"),
        }
    }
}

/// `<cache dir>/repograph`, or `./.repograph` when the platform has no cache dir
fn default_store_root() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .map(|base| base.join("repograph"))
        .unwrap_or_else(|| PathBuf::from(".repograph"))
}

/// Stable per-repository directory name, `<basename>-<hash of canonical path>`
pub(crate) fn repo_key(repo_path: &Path) -> String {
    use std::hash::{Hash, Hasher};

    let canonical = repo_path
        .canonicalize()
        .unwrap_or_else(|_| repo_path.to_path_buf());
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    canonical.hash(&mut hasher);

    let base: String = canonical
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .take(24)
        .collect();
    let base = if base.is_empty() { "repo".to_string() } else { base };

    format!("{}-{:016x}", base, hasher.finish())
}

/// Simple glob pattern matching
pub fn glob_match(pattern: &str, path: &str) -> bool {
    // **/X/** matches X as any directory component
    if pattern.starts_with("**/") && pattern.ends_with("/**") {
        let middle = pattern.trim_start_matches("**/").trim_end_matches("/**");
        return path.contains(&format!("/{}/", middle))
            || path.starts_with(&format!("{}/", middle));
    }

    if pattern.contains("**") {
        let parts: Vec<&str> = pattern.split("**").collect();
        if parts.len() == 2 {
            let prefix = parts[0].trim_end_matches('/');
            let suffix = parts[1].trim_start_matches('/');

            if !prefix.is_empty() && !path.starts_with(prefix) {
                return false;
            }

            // e.g. **/test_*.py
            match suffix.split_once('*') {
                Some((before, after)) => {
                    let name = path.rsplit('/').next().unwrap_or(path);
                    return name.starts_with(before) && name.ends_with(after);
                }
                None if !suffix.is_empty() => return path.ends_with(suffix),
                None => return true,
            }
        }
    }

    // Single * matches within one segment
    if let Some((prefix, suffix)) = pattern.split_once('*') {
        if !suffix.contains('*') {
            return path.starts_with(prefix) && path.ends_with(suffix);
        }
    }

    // "generated/" only matches "generated/foo.py", not "src/generated/foo.py"
    path.starts_with(pattern) || path == pattern
}
