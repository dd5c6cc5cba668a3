//! Keyword search over the indexed files.
//!
//! Scoring is a weighted keyword count: every query keyword contributes
//! `content occurrences × content weight + filename occurrences × filename
//! weight + path occurrences × path weight`, so a term hit in a file's name
//! outranks the same term hit in its path, which outranks a hit buried in
//! content. Files matching no keyword are excluded entirely. Search is
//! read-only and side-effect-free; "no results" is an empty list, not an
//! error.

use std::collections::HashSet;

use crate::config::SearchConfig;
use crate::error::{IndexError, Result};
use crate::index::store::{FileHit, IndexStore};

use super::excerpt::excerpt_around;

/// One ranked search result with a bounded excerpt.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SearchResult {
    pub file_path: String,
    pub file_name: String,
    /// Repository label as `owner/name`
    pub repository: String,
    pub branch: String,
    pub score: f64,
    pub excerpt: String,
    pub url: String,
}

/// Ranks indexed files by weighted keyword matches.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    store: IndexStore,
    config: SearchConfig,
}

impl SearchEngine {
    pub fn new(store: IndexStore, config: SearchConfig) -> Self {
        Self { store, config }
    }

    /// Search indexed files for `query`, returning at most `limit` results.
    ///
    /// `repo_filter` restricts the scan to one repository (`owner/name` or a
    /// bare name). A blank query is a validation error; a query whose tokens
    /// are all too short simply matches nothing.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<usize>,
        repo_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(IndexError::validation("search query must not be empty"));
        }
        let keywords = tokenize(query);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }
        let limit = limit.unwrap_or(self.config.default_limit);

        let hits = self.store.candidate_files(&keywords, repo_filter).await?;
        let mut scored: Vec<(f64, String, FileHit)> = hits
            .into_iter()
            .filter_map(|hit| {
                let (score, best_keyword) = self.score(&hit, &keywords)?;
                Some((score, best_keyword, hit))
            })
            .collect();

        // Higher score first, then most recently indexed, then path for a
        // stable overall order.
        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| b.2.indexed_at.cmp(&a.2.indexed_at))
                .then_with(|| a.2.path.cmp(&b.2.path))
        });
        scored.truncate(limit);

        Ok(scored
            .into_iter()
            .map(|(score, best_keyword, hit)| self.render(score, &best_keyword, hit))
            .collect())
    }

    /// Weighted score for one file, plus the keyword that contributed most
    /// (used to anchor the excerpt). `None` when nothing matches.
    fn score(&self, hit: &FileHit, keywords: &[String]) -> Option<(f64, String)> {
        let content = hit.content.to_lowercase();
        let name = hit.name.to_lowercase();
        let path = hit.path.to_lowercase();

        let mut total = 0.0;
        let mut best_keyword: Option<(f64, &str)> = None;
        for keyword in keywords {
            let contribution = count_occurrences(&content, keyword) as f64
                * self.config.content_weight
                + count_occurrences(&name, keyword) as f64 * self.config.filename_weight
                + count_occurrences(&path, keyword) as f64 * self.config.path_weight;
            if contribution <= 0.0 {
                continue;
            }
            total += contribution;
            if best_keyword.is_none_or(|(best, _)| contribution > best) {
                best_keyword = Some((contribution, keyword));
            }
        }

        best_keyword.map(|(_, keyword)| (total, keyword.to_string()))
    }

    fn render(&self, score: f64, best_keyword: &str, hit: FileHit) -> SearchResult {
        // Anchor the excerpt on the best keyword's first occurrence; a
        // filename-only match shows the head of the file instead.
        let offset = hit.content.to_lowercase().find(best_keyword).unwrap_or(0);
        let excerpt = excerpt_around(&hit.content, offset, self.config.excerpt_radius);
        let url = format!(
            "https://github.com/{}/{}/blob/{}/{}",
            hit.owner, hit.repo_name, hit.branch, hit.path
        );
        SearchResult {
            file_name: hit.name,
            repository: format!("{}/{}", hit.owner, hit.repo_name),
            branch: hit.branch,
            file_path: hit.path,
            score,
            excerpt,
            url,
        }
    }
}

/// Lowercase-tokenize a query, dropping tokens shorter than two characters
/// and duplicate tokens.
pub fn tokenize(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .filter(|token| seen.insert(token.to_string()))
        .map(str::to_string)
        .collect()
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    haystack.match_indices(needle).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_splits_and_drops_short_tokens() {
        assert_eq!(
            tokenize("ParseConfig, a YAML loader!"),
            vec!["parseconfig", "yaml", "loader"]
        );
        assert_eq!(tokenize("x y z"), Vec::<String>::new());
        // Identifier underscores survive tokenization
        assert_eq!(tokenize("read_file"), vec!["read_file"]);
    }

    #[test]
    fn tokenize_dedupes_preserving_order() {
        assert_eq!(tokenize("auth AUTH auth token"), vec!["auth", "token"]);
    }

    #[test]
    fn count_occurrences_counts_all_matches() {
        assert_eq!(count_occurrences("abc abc abc", "abc"), 3);
        assert_eq!(count_occurrences("abc", "missing"), 0);
    }
}
