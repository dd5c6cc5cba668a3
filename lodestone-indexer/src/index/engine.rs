//! High-level orchestration of one repository index run.
//!
//! The engine wires the pipeline together:
//!
//! ```text
//! preflight → TreeCrawler → ContentFetcher → IndexStore → metadata
//! ```
//!
//! Indexing one repository is idempotent but not safe to run twice
//! concurrently for the same (owner, name, branch); the engine serializes
//! such runs with a per-repository mutex. There is no whole-operation
//! timeout; very large repositories may run long by design.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

use super::readme;
use super::store::{IndexStore, NewFile};
use crate::config::IndexerConfig;
use crate::error::{IndexError, Result};
use crate::github::fetch::ContentFetcher;
use crate::github::tree::TreeCrawler;
use crate::github::RepoHost;

/// Maximum description length stored for a repository.
const DESCRIPTION_LIMIT: usize = 200;

/// Outcome of an index run. Counts make partial success distinguishable
/// from total failure: a run that fetched nothing still succeeded if the
/// repository itself resolved.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct IndexOutcome {
    pub repository_id: i64,
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
}

/// Orchestrates crawl, fetch, and persistence for repository indexing.
pub struct IndexingEngine {
    store: IndexStore,
    config: IndexerConfig,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IndexingEngine {
    pub fn new(store: IndexStore, config: IndexerConfig) -> Self {
        Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store, for search and listing.
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Index (or reindex) `owner/name`, walking the tree, fetching allowed
    /// content, and upserting the result.
    ///
    /// When `branch` is `None` the repository's default branch is used.
    /// Repository-level failures (auth, not-found, throttling) abort the
    /// call; per-file failures only show up in the outcome counts.
    pub async fn index_repository(
        &self,
        host: &dyn RepoHost,
        owner: &str,
        name: &str,
        branch: Option<&str>,
    ) -> Result<IndexOutcome> {
        validate_segment("owner", owner)?;
        validate_segment("name", name)?;

        // Existence preflight before any crawl work; also resolves the
        // default branch.
        let repo_info = host.repo_info(owner, name).await?;
        let branch = branch.unwrap_or(&repo_info.default_branch);
        if branch.trim().is_empty() {
            return Err(IndexError::validation("branch must not be empty"));
        }

        let lock = self.repo_lock(owner, name, branch);
        let _guard = lock.lock().await;

        info!("indexing {owner}/{name}@{branch}");
        let candidates = TreeCrawler::new(host).list(owner, name, branch).await?;
        let outcome = ContentFetcher::new(host, &self.config)
            .fetch(owner, name, branch, &candidates)
            .await;

        let repository_id = self.store.upsert_repository(owner, name, branch).await?;

        let files: Vec<NewFile> = outcome
            .fetched
            .into_iter()
            .map(|fetched| NewFile::from_content(fetched.path, fetched.content))
            .collect();
        self.store.upsert_files(repository_id, &files).await?;

        let keep_paths: Vec<String> = files.iter().map(|f| f.path.clone()).collect();
        self.store
            .remove_stale_files(repository_id, &keep_paths)
            .await?;

        let description = describe(&files, repo_info.description.as_deref());
        self.store
            .set_repository_metadata(repository_id, description.as_deref(), files.len() as i64)
            .await?;

        let result = IndexOutcome {
            repository_id,
            files_indexed: files.len(),
            files_skipped: outcome.skipped,
            files_failed: outcome.failed,
        };
        info!(
            "indexed {owner}/{name}@{branch}: {} files ({} skipped, {} failed)",
            result.files_indexed, result.files_skipped, result.files_failed
        );
        Ok(result)
    }

    /// Per-repository lock serializing concurrent reindex requests.
    fn repo_lock(&self, owner: &str, name: &str, branch: &str) -> Arc<tokio::sync::Mutex<()>> {
        let key = format!("{owner}/{name}@{branch}");
        let mut locks = self.locks.lock().expect("repo lock registry poisoned");
        locks.entry(key).or_default().clone()
    }
}

/// Repository description: the first qualifying README paragraph, falling
/// back to the host-reported description.
fn describe(files: &[NewFile], host_description: Option<&str>) -> Option<String> {
    let readme_text = files
        .iter()
        .find(|file| {
            let stem = file
                .name
                .rsplit_once('.')
                .map(|(stem, _)| stem)
                .unwrap_or(&file.name);
            stem.eq_ignore_ascii_case("readme")
        })
        .map(|file| file.content.as_str());

    if let Some(text) = readme_text {
        if let Some(description) = readme::extract_description(text, DESCRIPTION_LIMIT) {
            return Some(description);
        }
    }
    host_description
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.chars().take(DESCRIPTION_LIMIT).collect())
}

fn validate_segment(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(IndexError::validation(format!("{field} must not be empty")));
    }
    if value.contains('/') || value.contains(char::is_whitespace) {
        return Err(IndexError::validation(format!(
            "{field} must not contain '/' or whitespace: {value:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_and_name_validation() {
        assert!(validate_segment("owner", "acme").is_ok());
        assert!(validate_segment("owner", "").is_err());
        assert!(validate_segment("owner", "a/b").is_err());
        assert!(validate_segment("name", "two words").is_err());
    }

    #[test]
    fn describe_prefers_readme_over_host_description() {
        let files = vec![NewFile::from_content(
            "README.md".into(),
            "# Title\n\nFrom the readme.".into(),
        )];
        assert_eq!(
            describe(&files, Some("from the host")).as_deref(),
            Some("From the readme.")
        );
    }

    #[test]
    fn describe_falls_back_and_never_returns_empty() {
        let files = vec![NewFile::from_content("src/lib.rs".into(), "code".into())];
        assert_eq!(
            describe(&files, Some("host text")).as_deref(),
            Some("host text")
        );
        assert_eq!(describe(&files, Some("   ")), None);
        assert_eq!(describe(&files, None), None);
    }
}
