//! GitHub access layer: session handling, tree crawling, and content fetching.
//!
//! The pieces are deliberately small and composable:
//!
//! - **[`session::GithubSession`]**: a validated, caller-owned credential
//!   session wrapping the HTTP client
//! - **[`filter`]**: declarative allow/deny rules applied before any content
//!   is fetched
//! - **[`tree::TreeCrawler`]**: recursive repository listing plus filtering
//! - **[`fetch::ContentFetcher`]**: batched, bounded-concurrency content
//!   retrieval that tolerates per-file failures
//!
//! All remote operations go through the [`RepoHost`] trait so the crawler,
//! fetcher, and indexing engine can be exercised against an in-memory host
//! in tests.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

pub mod fetch;
pub mod filter;
pub mod session;
pub mod tree;

/// Repository metadata returned by the existence preflight.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    /// Branch the repository resolves to when the caller does not name one
    pub default_branch: String,
    /// Repository description as reported by the host, if any
    pub description: Option<String>,
}

/// One file descriptor from a repository tree listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the repository root
    pub path: String,
    /// Blob size in bytes as reported by the listing
    pub size: u64,
}

/// Remote operations needed to index one repository.
///
/// [`session::GithubSession`] is the production implementation; tests supply
/// an in-memory host with scripted trees, contents, and failures.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Resolve owner/name, returning the default branch and description.
    ///
    /// Fails with `NotFound` when the repository does not exist, so callers
    /// can verify a repository resolves before starting a full crawl.
    async fn repo_info(&self, owner: &str, name: &str) -> Result<RepoInfo>;

    /// List every blob in the repository tree at `branch`, recursively.
    ///
    /// Returns raw, unfiltered entries; inclusion rules are applied by the
    /// crawler afterwards.
    async fn list_tree(&self, owner: &str, name: &str, branch: &str) -> Result<Vec<TreeEntry>>;

    /// Fetch one blob's decoded text content.
    async fn fetch_blob(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        path: &str,
    ) -> Result<String>;
}
