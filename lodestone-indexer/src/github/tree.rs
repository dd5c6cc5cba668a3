//! Recursive repository tree crawling with pre-fetch filtering.

use tracing::debug;

use super::filter::{self, Decision};
use super::{RepoHost, TreeEntry};
use crate::error::Result;

/// Lists a repository's files and applies the inclusion rules before any
/// content is fetched, so excluded files never cost an API call.
pub struct TreeCrawler<'a> {
    host: &'a dyn RepoHost,
}

impl<'a> TreeCrawler<'a> {
    pub fn new(host: &'a dyn RepoHost) -> Self {
        Self { host }
    }

    /// Return the ordered candidate files of `owner/name` at `branch`.
    ///
    /// Fails with `NotFound` when the repository or branch does not resolve
    /// and `AuthRequired` when credentials are missing or invalid; both come
    /// straight from the host.
    pub async fn list(&self, owner: &str, name: &str, branch: &str) -> Result<Vec<TreeEntry>> {
        let entries = self.host.list_tree(owner, name, branch).await?;
        let total = entries.len();

        let mut candidates: Vec<TreeEntry> = entries
            .into_iter()
            .filter(|entry| filter::evaluate(&entry.path) == Decision::Index)
            .collect();
        candidates.sort_by(|a, b| a.path.cmp(&b.path));

        debug!(
            "crawled {owner}/{name}@{branch}: {} of {total} files pass the inclusion rules",
            candidates.len()
        );
        Ok(candidates)
    }
}
