//! lodestone-retrieval: merged retrieval for answer generation
//!
//! Combines ranked code-search results from
//! [`lodestone_indexer`] with an external document-search collaborator into
//! one deduplicated, score-normalized result set, rendered as labeled text
//! blocks ready to inject into AI-generated answers.
//!
//! ## Key Modules
//!
//! - **[`docsearch`]**: the collaborator interface both sources share
//! - **[`aggregator`]**: concurrent dual-source search, merge, and rendering

pub mod aggregator;
pub mod docsearch;

pub use aggregator::{AggregatorConfig, ContextBlock, RetrievalAggregator};
pub use docsearch::{DocExcerpt, DocumentSearch};
