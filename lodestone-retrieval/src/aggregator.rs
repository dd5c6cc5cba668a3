//! Merged retrieval across code search and document search.
//!
//! Both sources run concurrently. Scores are normalized per source (each
//! source's results divided by that source's maximum) before merging, since
//! the raw scales are not comparable. If one source errors the other's
//! results are still returned; only both failing yields an empty set.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

use lodestone_indexer::search::engine::SearchEngine;

use crate::docsearch::DocumentSearch;

/// Caps for the merged result set.
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Results requested from the code search source
    pub code_limit: usize,
    /// Results requested from the document search source
    pub doc_limit: usize,
    /// Cap on the merged, deduplicated result set
    pub max_results: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            code_limit: 5,
            doc_limit: 5,
            max_results: 6,
        }
    }
}

/// One merged result, rendered as a labeled, source-attributed block.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ContextBlock {
    /// Display label, e.g. `code: acme/widgets src/lib.rs` or `doc: Setup guide`
    pub label: String,
    /// Stable source identity (also the deduplication key)
    pub source_url: String,
    /// Score normalized to [0, 1] within the originating source
    pub score: f64,
    /// Excerpt body
    pub body: String,
}

impl ContextBlock {
    /// Render as a text block for generation context.
    pub fn render(&self) -> String {
        format!("### {} ({})\n{}", self.label, self.source_url, self.body)
    }
}

/// Merges code-search output with a document-search collaborator into one
/// ranked, formatted result set.
pub struct RetrievalAggregator {
    code: SearchEngine,
    documents: Arc<dyn DocumentSearch>,
    config: AggregatorConfig,
}

impl RetrievalAggregator {
    pub fn new(
        code: SearchEngine,
        documents: Arc<dyn DocumentSearch>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            code,
            documents,
            config,
        }
    }

    /// Retrieve context for `query` from both sources.
    ///
    /// Degrades gracefully: a failing source is logged and treated as empty
    /// rather than failing the whole call.
    pub async fn enhance(&self, query: &str) -> Vec<ContextBlock> {
        let (code_results, doc_results) = tokio::join!(
            self.code.search(query, Some(self.config.code_limit), None),
            self.documents.search(query, self.config.doc_limit),
        );

        let code_results = code_results.unwrap_or_else(|e| {
            warn!("code search failed, continuing with documents only: {e}");
            Vec::new()
        });
        let doc_results = doc_results.unwrap_or_else(|e| {
            warn!("document search failed, continuing with code only: {e}");
            Vec::new()
        });

        let code_max = code_results
            .iter()
            .map(|r| r.score)
            .fold(0.0_f64, f64::max);
        let doc_max = doc_results.iter().map(|r| r.score).fold(0.0_f64, f64::max);

        let mut blocks: Vec<ContextBlock> = Vec::new();
        for result in code_results {
            blocks.push(ContextBlock {
                label: format!("code: {} {}", result.repository, result.file_path),
                source_url: result.url,
                score: normalize(result.score, code_max),
                body: result.excerpt,
            });
        }
        for result in doc_results {
            blocks.push(ContextBlock {
                label: format!("doc: {}", result.title),
                source_url: result.source_url,
                score: normalize(result.score, doc_max),
                body: result.excerpt,
            });
        }

        // Best first, then dedup by source identity so the stronger variant
        // of a duplicated source survives.
        blocks.sort_by(|a, b| b.score.total_cmp(&a.score));
        let mut seen = HashSet::new();
        blocks.retain(|block| seen.insert(block.source_url.clone()));
        blocks.truncate(self.config.max_results);
        blocks
    }

    /// Retrieve and render context as one text section per source.
    pub async fn enhance_to_text(&self, query: &str) -> String {
        self.enhance(query)
            .await
            .iter()
            .map(ContextBlock::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn normalize(score: f64, max: f64) -> f64 {
    if max > 0.0 { score / max } else { 0.0 }
}
