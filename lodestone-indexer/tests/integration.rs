//! Integration tests for the indexing pipeline and keyword search.
//!
//! These run the whole write path (preflight → crawl → fetch → store)
//! against an in-memory repository host, then exercise search over the
//! resulting store.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing_test::traced_test;

use lodestone_indexer::config::{IndexerConfig, SearchConfig};
use lodestone_indexer::error::IndexError;
use lodestone_indexer::github::{RepoHost, RepoInfo, TreeEntry};
use lodestone_indexer::index::store::NewFile;
use lodestone_indexer::index::{engine::IndexingEngine, store::IndexStore};
use lodestone_indexer::search::engine::SearchEngine;

/// Scripted repository host: a fixed tree of files, optional per-path
/// failures, and an optional missing-repository mode.
#[derive(Default)]
struct MockHost {
    files: BTreeMap<String, String>,
    fail_paths: HashSet<String>,
    missing: bool,
}

impl MockHost {
    fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    fn failing(mut self, path: &str) -> Self {
        self.fail_paths.insert(path.to_string());
        self
    }
}

#[async_trait]
impl RepoHost for MockHost {
    async fn repo_info(&self, owner: &str, name: &str) -> lodestone_indexer::Result<RepoInfo> {
        if self.missing {
            return Err(IndexError::not_found(owner, name, None));
        }
        Ok(RepoInfo {
            default_branch: "main".to_string(),
            description: Some("host-side description".to_string()),
        })
    }

    async fn list_tree(
        &self,
        _owner: &str,
        _name: &str,
        _branch: &str,
    ) -> lodestone_indexer::Result<Vec<TreeEntry>> {
        Ok(self
            .files
            .iter()
            .map(|(path, content)| TreeEntry {
                path: path.clone(),
                size: content.len() as u64,
            })
            .collect())
    }

    async fn fetch_blob(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        path: &str,
    ) -> lodestone_indexer::Result<String> {
        if self.fail_paths.contains(path) {
            return Err(IndexError::validation(format!("scripted failure for {path}")));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| IndexError::not_found(owner, name, Some(branch)))
    }
}

fn fast_config() -> IndexerConfig {
    IndexerConfig::default()
        .with_batch_size(2)
        .with_batch_pause(Duration::ZERO)
}

async fn engine() -> Result<IndexingEngine> {
    let store = IndexStore::open_memory().await?;
    Ok(IndexingEngine::new(store, fast_config()))
}

/// Deny-listed files never reach the store: 3 allowed + 2 denied → 3 indexed.
#[tokio::test]
async fn index_applies_inclusion_rules_before_fetch() -> Result<()> {
    let host = MockHost::with_files(&[
        ("src/main.rs", "fn main() {}"),
        ("README.md", "# Widgets\n\nBuilds widgets."),
        ("config.yaml", "key: value"),
        ("node_modules/react/index.js", "module.exports = {}"),
        ("Cargo.lock", "[[package]]"),
    ]);
    let engine = engine().await?;

    let outcome = engine
        .index_repository(&host, "acme", "widgets", None)
        .await?;
    assert_eq!(outcome.files_indexed, 3);
    assert_eq!(outcome.files_failed, 0);

    let repos = engine.store().list_repositories().await?;
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].file_count, 3);
    Ok(())
}

/// Reindexing identical content yields identical counts and no duplicates.
#[tokio::test]
async fn reindex_is_idempotent() -> Result<()> {
    let host = MockHost::with_files(&[
        ("src/lib.rs", "pub fn alpha() {}"),
        ("src/util.rs", "pub fn beta() {}"),
    ]);
    let engine = engine().await?;

    let first = engine
        .index_repository(&host, "acme", "widgets", None)
        .await?;
    let second = engine
        .index_repository(&host, "acme", "widgets", None)
        .await?;

    assert_eq!(first.repository_id, second.repository_id);
    assert_eq!(first.files_indexed, second.files_indexed);

    let stats = engine.store().stats().await?;
    assert_eq!(stats.repositories, 1);
    assert_eq!(stats.files, 2);
    Ok(())
}

/// A file removed upstream disappears from the index on the next run, and
/// file_count tracks the latest run.
#[tokio::test]
async fn reindex_prunes_files_removed_upstream() -> Result<()> {
    let engine = engine().await?;

    let before = MockHost::with_files(&[
        ("src/keep.rs", "keep"),
        ("src/gone.rs", "unique_gone_marker"),
    ]);
    engine
        .index_repository(&before, "acme", "widgets", None)
        .await?;

    let after = MockHost::with_files(&[("src/keep.rs", "keep")]);
    let outcome = engine
        .index_repository(&after, "acme", "widgets", None)
        .await?;
    assert_eq!(outcome.files_indexed, 1);

    let repo = engine
        .store()
        .get_repository(outcome.repository_id)
        .await?
        .expect("repository row");
    assert_eq!(repo.file_count, 1);

    let search = SearchEngine::new(engine.store().clone(), SearchConfig::default());
    let results = search.search("unique_gone_marker", None, None).await?;
    assert!(results.is_empty());
    Ok(())
}

/// A file exactly at the ceiling is indexed; one byte over is skipped and
/// counted as skipped, not failed.
#[tokio::test]
async fn byte_ceiling_boundary() -> Result<()> {
    let at_limit = "a".repeat(64);
    let over_limit = "b".repeat(65);
    let host = MockHost::with_files(&[
        ("at_limit.txt", at_limit.as_str()),
        ("over_limit.txt", over_limit.as_str()),
    ]);

    let store = IndexStore::open_memory().await?;
    let config = fast_config().with_max_file_bytes(64);
    let engine = IndexingEngine::new(store, config);

    let outcome = engine
        .index_repository(&host, "acme", "widgets", None)
        .await?;
    assert_eq!(outcome.files_indexed, 1);
    assert_eq!(outcome.files_skipped, 1);
    assert_eq!(outcome.files_failed, 0);
    Ok(())
}

/// One file failing to fetch never aborts the run; it is excluded and
/// counted, and file_count reflects only successful fetches.
#[tokio::test]
#[traced_test]
async fn per_file_failures_do_not_abort_the_index() -> Result<()> {
    let host = MockHost::with_files(&[
        ("src/good.rs", "fine"),
        ("src/bad.rs", "never fetched"),
        ("src/also_good.rs", "fine too"),
    ])
    .failing("src/bad.rs");
    let engine = engine().await?;

    let outcome = engine
        .index_repository(&host, "acme", "widgets", None)
        .await?;
    assert_eq!(outcome.files_indexed, 2);
    assert_eq!(outcome.files_failed, 1);

    let repo = engine
        .store()
        .get_repository(outcome.repository_id)
        .await?
        .expect("repository row");
    assert_eq!(repo.file_count, 2);
    assert!(logs_contain("failed to fetch src/bad.rs"));
    Ok(())
}

/// Rows written through a persistent store survive reopening it.
#[tokio::test]
async fn persistent_store_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    {
        let store = IndexStore::open(dir.path()).await?;
        let repo = store.upsert_repository("acme", "widgets", "main").await?;
        store
            .upsert_files(repo, &[NewFile::from_content("a.rs".into(), "alpha".into())])
            .await?;
        store.set_repository_metadata(repo, None, 1).await?;
    }

    let reopened = IndexStore::open(dir.path()).await?;
    let repos = reopened.list_repositories().await?;
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].file_count, 1);
    Ok(())
}

/// A missing repository aborts the whole call with NotFound.
#[tokio::test]
async fn missing_repository_aborts_with_not_found() -> Result<()> {
    let host = MockHost {
        missing: true,
        ..MockHost::default()
    };
    let engine = engine().await?;

    let err = engine
        .index_repository(&host, "acme", "ghost", None)
        .await
        .expect_err("indexing a missing repository must fail");
    assert!(matches!(err, IndexError::NotFound { .. }));
    Ok(())
}

/// Repository description comes from the README's first paragraph.
#[tokio::test]
async fn description_extracted_from_readme() -> Result<()> {
    let host = MockHost::with_files(&[(
        "README.md",
        "# Widgets\n\n[![CI](x)](y)\n\nA small library for widget assembly.\n\nMore detail.",
    )]);
    let engine = engine().await?;

    let outcome = engine
        .index_repository(&host, "acme", "widgets", None)
        .await?;
    let repo = engine
        .store()
        .get_repository(outcome.repository_id)
        .await?
        .expect("repository row");
    assert_eq!(
        repo.description.as_deref(),
        Some("A small library for widget assembly.")
    );
    Ok(())
}

async fn searchable_engine() -> Result<(IndexingEngine, SearchEngine)> {
    let engine = engine().await?;
    let host = MockHost::with_files(&[
        (
            "src/parseConfig.rs",
            "pub fn load() { /* reads settings */ }",
        ),
        (
            "src/settings.rs",
            "// parseConfig is called from here\npub struct Settings;",
        ),
        ("src/auth/handler.rs", "pub fn handle() {}"),
        ("docs/guide.md", "A guide.\nNothing else of note."),
    ]);
    engine
        .index_repository(&host, "acme", "widgets", None)
        .await?;
    let search = SearchEngine::new(engine.store().clone(), SearchConfig::default());
    Ok((engine, search))
}

/// Scenario B: the file *named* parseConfig outranks the file that merely
/// mentions it once in content.
#[tokio::test]
async fn filename_match_outranks_content_mention() -> Result<()> {
    let (_engine, search) = searchable_engine().await?;

    let results = search.search("parseConfig", Some(2), None).await?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].file_name, "parseConfig.rs");
    assert!(results[0].score > results[1].score);
    Ok(())
}

/// A term present only in a file's path still matches and ranks it.
#[tokio::test]
async fn path_only_match_is_found() -> Result<()> {
    let (_engine, search) = searchable_engine().await?;

    let results = search.search("auth", None, None).await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].file_path, "src/auth/handler.rs");
    assert!(results[0].score > 0.0);
    Ok(())
}

/// Increasing the limit never removes previously returned results.
#[tokio::test]
async fn limit_increase_is_monotonic() -> Result<()> {
    let (_engine, search) = searchable_engine().await?;

    let narrow = search.search("parseConfig settings", Some(1), None).await?;
    let wide = search.search("parseConfig settings", Some(5), None).await?;
    assert!(wide.len() >= narrow.len());
    for (a, b) in narrow.iter().zip(wide.iter()) {
        assert_eq!(a.file_path, b.file_path);
    }
    Ok(())
}

/// Excerpts stay within the configured window.
#[tokio::test]
async fn excerpt_respects_window() -> Result<()> {
    let engine = engine().await?;
    let long_line = format!("{} needle {}", "x".repeat(500), "y".repeat(500));
    let host = MockHost::with_files(&[("big.txt", long_line.as_str())]);
    engine
        .index_repository(&host, "acme", "widgets", None)
        .await?;

    let config = SearchConfig::default().with_excerpt_radius(50);
    let search = SearchEngine::new(engine.store().clone(), config);
    let results = search.search("needle", None, None).await?;
    assert_eq!(results.len(), 1);
    assert!(results[0].excerpt.contains("needle"));
    assert!(results[0].excerpt.len() <= 100);
    Ok(())
}

/// Scenario C: deleting a repository removes it from listings and search.
#[tokio::test]
async fn delete_removes_listing_and_matches() -> Result<()> {
    let (engine, search) = searchable_engine().await?;
    let repos = engine.store().list_repositories().await?;
    assert_eq!(repos.len(), 1);

    assert!(engine.store().delete_repository(repos[0].id).await?);
    assert!(engine.store().list_repositories().await?.is_empty());

    let results = search.search("parseConfig", None, None).await?;
    assert!(results.is_empty());
    Ok(())
}

/// The repository filter restricts results to one repository.
#[tokio::test]
async fn repo_filter_restricts_results() -> Result<()> {
    let engine = engine().await?;
    let first = MockHost::with_files(&[("src/a.rs", "shared_term here")]);
    let second = MockHost::with_files(&[("src/b.rs", "shared_term there")]);
    engine.index_repository(&first, "acme", "alpha", None).await?;
    engine.index_repository(&second, "acme", "beta", None).await?;

    let search = SearchEngine::new(engine.store().clone(), SearchConfig::default());
    let all = search.search("shared_term", None, None).await?;
    assert_eq!(all.len(), 2);

    let filtered = search
        .search("shared_term", None, Some("acme/alpha"))
        .await?;
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].repository, "acme/alpha");
    Ok(())
}

/// A blank query is a validation error; no results is not.
#[tokio::test]
async fn blank_query_is_rejected_and_no_results_is_empty() -> Result<()> {
    let (_engine, search) = searchable_engine().await?;

    let err = search.search("   ", None, None).await.expect_err("blank");
    assert!(matches!(err, IndexError::Validation { .. }));

    let results = search.search("zzz_does_not_exist_zzz", None, None).await?;
    assert!(results.is_empty());
    Ok(())
}
