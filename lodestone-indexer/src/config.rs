//! Configuration for the indexing pipeline and the search engine.
//!
//! Both config structs follow the builder pattern: construct with
//! [`IndexerConfig::default`] / [`SearchConfig::default`] and override
//! individual knobs with the `with_*` methods. The CLI can also load both
//! sections from a TOML file via [`Settings::load`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration for crawling and fetching repository content.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Base URL of the GitHub API (override for GitHub Enterprise or tests)
    pub api_base: String,
    /// Number of files fetched per batch
    pub batch_size: usize,
    /// Maximum in-flight content requests within a batch
    pub max_concurrent_fetches: usize,
    /// Pause between batches, in milliseconds, to stay under external rate limits
    pub batch_pause_ms: u64,
    /// Per-file content ceiling in bytes; larger files are skipped, not erred
    pub max_file_bytes: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            batch_size: 10,
            max_concurrent_fetches: 10,
            batch_pause_ms: 500,
            max_file_bytes: 100_000,
        }
    }
}

impl IndexerConfig {
    /// Override the GitHub API base URL.
    pub fn with_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Override the fetch batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Override the per-file byte ceiling.
    pub fn with_max_file_bytes(mut self, max_file_bytes: usize) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    /// Override the pause inserted between fetch batches.
    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause_ms = pause.as_millis() as u64;
        self
    }

    /// Pause inserted between fetch batches.
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

/// Tunable weights and bounds for keyword search.
///
/// The exact numbers are heuristic; the invariant callers may rely on is the
/// relative ordering `filename_weight > path_weight > content_weight`, so a
/// filename hit always outranks an equal number of path or content hits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Weight applied per keyword occurrence in file content
    pub content_weight: f64,
    /// Weight applied per keyword occurrence in the file name
    pub filename_weight: f64,
    /// Weight applied per keyword occurrence in the file path
    pub path_weight: f64,
    /// Characters taken on each side of the best match when building excerpts
    pub excerpt_radius: usize,
    /// Result cap used when the caller does not pass an explicit limit
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            content_weight: 1.0,
            filename_weight: 3.0,
            path_weight: 2.0,
            excerpt_radius: 200,
            default_limit: 5,
        }
    }
}

impl SearchConfig {
    /// Override the excerpt window radius.
    pub fn with_excerpt_radius(mut self, radius: usize) -> Self {
        self.excerpt_radius = radius;
        self
    }

    /// Override the default result limit.
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }
}

/// Combined settings file for the CLI, with both sections optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub indexer: IndexerConfig,
    pub search: SearchConfig,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing settings file {}", path.display()))
    }
}
