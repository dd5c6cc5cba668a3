//! Document-search collaborator interface.

use async_trait::async_trait;

/// One ranked excerpt from a document source.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DocExcerpt {
    /// Human-readable document title
    pub title: String,
    /// Bounded excerpt of the matching region
    pub excerpt: String,
    /// Source-local relevance score (any positive scale)
    pub score: f64,
    /// Stable identity of the source document, used for deduplication
    pub source_url: String,
}

/// Ranked document search with the same `{query, limit}` shape as code
/// search, so the aggregator treats both sources uniformly.
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<DocExcerpt>>;
}
