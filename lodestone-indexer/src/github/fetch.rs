//! Batched content fetching with bounded concurrency.
//!
//! Candidates are processed in fixed-size batches with a pause between
//! batches so sustained crawls stay under external rate limits. Inside a
//! batch, requests run concurrently up to a bound. A single file failing
//! (network error, 404, undecodable content) is recorded and excluded; it
//! never aborts the batch or the ones after it.

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::{RepoHost, TreeEntry};
use crate::config::IndexerConfig;

/// One successfully fetched file.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub path: String,
    pub content: String,
}

/// Result of fetching a candidate set: the files that made it, plus counts
/// for the ones that did not.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub fetched: Vec<FetchedFile>,
    /// Files skipped on purpose (over the byte ceiling)
    pub skipped: usize,
    /// Files that errored during fetch or decode
    pub failed: usize,
}

/// Retrieves decoded text for candidate files in rate-limit-friendly batches.
pub struct ContentFetcher<'a> {
    host: &'a dyn RepoHost,
    config: &'a IndexerConfig,
}

impl<'a> ContentFetcher<'a> {
    pub fn new(host: &'a dyn RepoHost, config: &'a IndexerConfig) -> Self {
        Self { host, config }
    }

    /// Fetch every candidate, returning contents plus skip/failure counts.
    ///
    /// This never fails as a whole: repository-level errors are ruled out by
    /// the preflight and crawl that precede it, and everything per-file is
    /// aggregated into the outcome.
    pub async fn fetch(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        candidates: &[TreeEntry],
    ) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        let batches = candidates.chunks(self.config.batch_size.max(1));
        let batch_count = batches.len();

        for (batch_index, batch) in batches.enumerate() {
            // The listing already reports sizes, so oversize files are
            // skipped before spending a request on them.
            let (to_fetch, oversize): (Vec<&TreeEntry>, Vec<&TreeEntry>) = batch
                .iter()
                .partition(|entry| entry.size as usize <= self.config.max_file_bytes);
            for entry in &oversize {
                debug!("skipping {}: {} bytes over ceiling", entry.path, entry.size);
            }
            outcome.skipped += oversize.len();

            let results: Vec<_> = stream::iter(to_fetch)
                .map(|entry| async move {
                    let result = self
                        .host
                        .fetch_blob(owner, name, branch, &entry.path)
                        .await;
                    (entry, result)
                })
                .buffer_unordered(self.config.max_concurrent_fetches.max(1))
                .collect()
                .await;

            for (entry, result) in results {
                match result {
                    // Listed sizes can be stale, so the ceiling is enforced
                    // again on the fetched body.
                    Ok(content) if content.len() <= self.config.max_file_bytes => {
                        outcome.fetched.push(FetchedFile {
                            path: entry.path.clone(),
                            content,
                        });
                    }
                    Ok(_) => {
                        debug!("skipping {}: fetched body over ceiling", entry.path);
                        outcome.skipped += 1;
                    }
                    Err(e) => {
                        warn!("failed to fetch {}: {e}", entry.path);
                        outcome.failed += 1;
                    }
                }
            }

            if batch_index + 1 < batch_count {
                tokio::time::sleep(self.config.batch_pause()).await;
            }
        }

        debug!(
            "fetched {} files from {owner}/{name}@{branch} ({} skipped, {} failed)",
            outcome.fetched.len(),
            outcome.skipped,
            outcome.failed
        );
        outcome
    }
}
