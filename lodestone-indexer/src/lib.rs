//! lodestone-indexer: GitHub repository indexing and keyword search
//!
//! This crate ingests GitHub repositories into a local SQLite store and
//! serves ranked keyword search results over the indexed files. It handles
//! recursive tree crawling under rate limits, content filtering before any
//! fetch, bounded-concurrency batched fetching, and idempotent persistence.
//!
//! ## Key Modules
//!
//! - **[`github`]**: authenticated session, tree crawler, content fetcher,
//!   and the declarative file inclusion rules
//! - **[`index`]**: SQLite store, indexing engine, description extraction
//! - **[`search`]**: weighted keyword ranking with bounded excerpts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lodestone_indexer::config::{IndexerConfig, SearchConfig};
//! use lodestone_indexer::github::session::GithubSession;
//! use lodestone_indexer::index::{engine::IndexingEngine, store::IndexStore};
//! use lodestone_indexer::search::engine::SearchEngine;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = IndexStore::open(Path::new(".")).await?;
//! let config = IndexerConfig::default();
//! let session =
//!     GithubSession::authenticate(reqwest::Client::new(), &config.api_base, "token").await?;
//!
//! let engine = IndexingEngine::new(store.clone(), config);
//! let outcome = engine
//!     .index_repository(&session, "acme", "widgets", None)
//!     .await?;
//! println!("indexed {} files", outcome.files_indexed);
//!
//! let search = SearchEngine::new(store, SearchConfig::default());
//! for result in search.search("parse config", None, None).await? {
//!     println!("{:.1} {} {}", result.score, result.file_path, result.url);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! GithubSession → TreeCrawler → ContentFetcher → IndexStore   (write path)
//!                                                     ↓
//!                              query → SearchEngine → ranked excerpts
//! ```

pub mod config;
pub mod error;
pub mod github;
pub mod index;
pub mod search;

pub use error::{IndexError, Result};
