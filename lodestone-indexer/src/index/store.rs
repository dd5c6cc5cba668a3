//! SQLite persistence for indexed repositories and files.
//!
//! This module is the data layer of the indexer: repositories and their
//! files live in two related tables with upsert semantics keyed by the
//! uniqueness constraints below.
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE repositories (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     owner TEXT NOT NULL,
//!     name TEXT NOT NULL,
//!     branch TEXT NOT NULL DEFAULT 'main',
//!     description TEXT,                    -- nullable, never an empty string
//!     file_count INTEGER NOT NULL,        -- files fetched on the latest index
//!     indexed_at TIMESTAMP,
//!     UNIQUE(owner, name, branch)
//! );
//!
//! CREATE TABLE files (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     repository_id INTEGER REFERENCES repositories(id) ON DELETE CASCADE,
//!     path TEXT NOT NULL,                  -- repository-relative
//!     name TEXT NOT NULL,                  -- final path segment
//!     extension TEXT,                      -- nullable (Makefile, Dockerfile)
//!     content TEXT NOT NULL,               -- size-bounded text
//!     size INTEGER NOT NULL,
//!     indexed_at TIMESTAMP,
//!     UNIQUE(repository_id, path)
//! );
//! ```
//!
//! Reindexing overwrites file rows in place via `ON CONFLICT DO UPDATE`;
//! deleting a repository cascades to its files through the foreign key.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;

/// A file prepared for insertion, derived from fetched content.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub path: String,
    pub name: String,
    pub extension: Option<String>,
    pub content: String,
    pub size: i64,
}

impl NewFile {
    /// Build a file row from a repository-relative path and its content.
    pub fn from_content(path: String, content: String) -> Self {
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        let extension = name.rsplit_once('.').and_then(|(stem, ext)| {
            if stem.is_empty() || ext.is_empty() {
                None
            } else {
                Some(ext.to_ascii_lowercase())
            }
        });
        let size = content.len() as i64;
        Self {
            path,
            name,
            extension,
            content,
            size,
        }
    }
}

/// Summary row for one indexed repository.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RepositorySummary {
    pub id: i64,
    pub owner: String,
    pub name: String,
    pub branch: String,
    pub description: Option<String>,
    pub file_count: i64,
    pub indexed_at: DateTime<Utc>,
}

impl RepositorySummary {
    /// Browsable URL of the indexed branch.
    pub fn url(&self) -> String {
        format!(
            "https://github.com/{}/{}/tree/{}",
            self.owner, self.name, self.branch
        )
    }
}

/// A candidate file row joined with its repository, as consumed by search.
#[derive(Debug, Clone)]
pub struct FileHit {
    pub repository_id: i64,
    pub owner: String,
    pub repo_name: String,
    pub branch: String,
    pub path: String,
    pub name: String,
    pub content: String,
    pub indexed_at: DateTime<Utc>,
}

/// Store-wide counts for status reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StoreStats {
    pub repositories: i64,
    pub files: i64,
    pub content_bytes: i64,
}

/// SQLite-backed index of repositories and files.
#[derive(Debug, Clone)]
pub struct IndexStore {
    pool: SqlitePool,
}

impl IndexStore {
    /// Open (or create) the persistent index under `base`.
    pub async fn open(base: &Path) -> Result<Self> {
        let db_path = base.join(".lodestone.db");
        let pool = SqlitePool::connect_with(
            SqliteConnectOptions::new()
                .filename(db_path)
                .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
                .busy_timeout(std::time::Duration::from_secs(5))
                .foreign_keys(true)
                .create_if_missing(true),
        )
        .await?;
        Self::new_with_pool(pool).await
    }

    /// Open an in-memory index for testing.
    pub async fn open_memory() -> Result<Self> {
        // Single connection so every handle sees the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true))
            .await?;
        Self::new_with_pool(pool).await
    }

    async fn new_with_pool(pool: SqlitePool) -> Result<Self> {
        Self::create_tables(&pool).await?;
        Ok(Self { pool })
    }

    async fn create_tables(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS repositories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                branch TEXT NOT NULL DEFAULT 'main',
                description TEXT,
                file_count INTEGER NOT NULL DEFAULT 0,
                indexed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                CONSTRAINT unique_repo UNIQUE(owner, name, branch)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                repository_id INTEGER NOT NULL,
                path TEXT NOT NULL,
                name TEXT NOT NULL,
                extension TEXT,
                content TEXT NOT NULL,
                size INTEGER NOT NULL,
                indexed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                CONSTRAINT unique_file UNIQUE(repository_id, path),
                FOREIGN KEY (repository_id) REFERENCES repositories(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_name ON files(name)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_indexed ON files(indexed_at)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Create or return the repository identified by (owner, name, branch).
    ///
    /// Atomic insert-or-update under the uniqueness constraint, so two
    /// racing callers both land on the same row id.
    pub async fn upsert_repository(&self, owner: &str, name: &str, branch: &str) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO repositories (owner, name, branch)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(owner, name, branch) DO UPDATE SET branch = excluded.branch
            RETURNING id
            "#,
        )
        .bind(owner)
        .bind(name)
        .bind(branch)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Insert or overwrite files by (repository, path) in one transaction.
    ///
    /// A duplicate path within one call overwrites the earlier entry rather
    /// than producing a second row.
    pub async fn upsert_files(&self, repository_id: i64, files: &[NewFile]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for file in files {
            sqlx::query(
                r#"
                INSERT INTO files (repository_id, path, name, extension, content, size, indexed_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, datetime('now'))
                ON CONFLICT(repository_id, path) DO UPDATE SET
                    name = excluded.name,
                    extension = excluded.extension,
                    content = excluded.content,
                    size = excluded.size,
                    indexed_at = excluded.indexed_at
                "#,
            )
            .bind(repository_id)
            .bind(&file.path)
            .bind(&file.name)
            .bind(&file.extension)
            .bind(&file.content)
            .bind(file.size)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete files of a repository whose paths are not in `keep_paths`.
    ///
    /// Used after a reindex so files removed upstream drop out of the index.
    pub async fn remove_stale_files(
        &self,
        repository_id: i64,
        keep_paths: &[String],
    ) -> Result<usize> {
        let keep: HashSet<&str> = keep_paths.iter().map(String::as_str).collect();
        let rows = sqlx::query("SELECT id, path FROM files WHERE repository_id = ?1")
            .bind(repository_id)
            .fetch_all(&self.pool)
            .await?;

        let stale: Vec<i64> = rows
            .iter()
            .filter(|row| !keep.contains(row.get::<String, _>("path").as_str()))
            .map(|row| row.get::<i64, _>("id"))
            .collect();

        // Chunked deletes keep the bind count under SQLite's parameter limit
        for chunk in stale.chunks(500) {
            let placeholders = chunk
                .iter()
                .enumerate()
                .map(|(i, _)| format!("?{}", i + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let query = format!("DELETE FROM files WHERE id IN ({placeholders})");
            let mut query_builder = sqlx::query(&query);
            for id in chunk {
                query_builder = query_builder.bind(id);
            }
            query_builder.execute(&self.pool).await?;
        }
        Ok(stale.len())
    }

    /// Record the outcome of an index run on the repository row.
    ///
    /// `file_count` must be the number of files successfully fetched on this
    /// run; skipped and failed files never inflate it. A `None` description
    /// stays NULL rather than collapsing to an empty string.
    pub async fn set_repository_metadata(
        &self,
        repository_id: i64,
        description: Option<&str>,
        file_count: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE repositories
            SET description = ?2, file_count = ?3, indexed_at = datetime('now')
            WHERE id = ?1
            "#,
        )
        .bind(repository_id)
        .bind(description)
        .bind(file_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Delete a repository and, via cascade, all of its files.
    pub async fn delete_repository(&self, repository_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM repositories WHERE id = ?1")
            .bind(repository_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fetch one repository summary by id.
    pub async fn get_repository(&self, repository_id: i64) -> Result<Option<RepositorySummary>> {
        let row = sqlx::query(
            "SELECT id, owner, name, branch, description, file_count, indexed_at
             FROM repositories WHERE id = ?1",
        )
        .bind(repository_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| summary_from_row(&row)))
    }

    /// List all indexed repositories.
    pub async fn list_repositories(&self) -> Result<Vec<RepositorySummary>> {
        let rows = sqlx::query(
            "SELECT id, owner, name, branch, description, file_count, indexed_at
             FROM repositories ORDER BY owner, name, branch",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(summary_from_row).collect())
    }

    /// Files containing any of `keywords` in content or path.
    ///
    /// This is the coarse candidate scan behind search: matching is
    /// case-insensitive substring containment, and exact scoring happens in
    /// [`SearchEngine`](crate::search::engine::SearchEngine) afterwards.
    /// `repo_filter` accepts `owner/name` or a bare repository name.
    pub async fn candidate_files(
        &self,
        keywords: &[String],
        repo_filter: Option<&str>,
    ) -> Result<Vec<FileHit>> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let mut clauses = Vec::new();
        let mut bind_index = 0;
        for _ in keywords {
            bind_index += 1;
            clauses.push(format!(
                "(instr(lower(f.content), ?{bind_index}) > 0 OR instr(lower(f.path), ?{bind_index}) > 0)"
            ));
        }
        let mut sql = format!(
            "SELECT f.repository_id, f.path, f.name, f.content, f.indexed_at,
                    r.owner, r.name AS repo_name, r.branch
             FROM files f
             JOIN repositories r ON r.id = f.repository_id
             WHERE ({})",
            clauses.join(" OR ")
        );

        let filter_parts = repo_filter.map(|filter| match filter.split_once('/') {
            Some((owner, name)) => (Some(owner.to_string()), name.to_string()),
            None => (None, filter.to_string()),
        });
        match &filter_parts {
            Some((Some(_), _)) => {
                sql.push_str(&format!(
                    " AND r.owner = ?{} AND r.name = ?{}",
                    bind_index + 1,
                    bind_index + 2
                ));
            }
            Some((None, _)) => {
                sql.push_str(&format!(" AND r.name = ?{}", bind_index + 1));
            }
            None => {}
        }

        let mut query = sqlx::query(&sql);
        for keyword in keywords {
            query = query.bind(keyword);
        }
        if let Some((owner, name)) = filter_parts {
            if let Some(owner) = owner {
                query = query.bind(owner);
            }
            query = query.bind(name);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| FileHit {
                repository_id: row.get("repository_id"),
                owner: row.get("owner"),
                repo_name: row.get("repo_name"),
                branch: row.get("branch"),
                path: row.get("path"),
                name: row.get("name"),
                content: row.get("content"),
                indexed_at: row.get("indexed_at"),
            })
            .collect())
    }

    /// Store-wide counts for status output.
    pub async fn stats(&self) -> Result<StoreStats> {
        let repositories =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM repositories")
                .fetch_one(&self.pool)
                .await?;
        let files = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await?;
        let content_bytes =
            sqlx::query_scalar::<_, i64>("SELECT COALESCE(SUM(size), 0) FROM files")
                .fetch_one(&self.pool)
                .await?;
        Ok(StoreStats {
            repositories,
            files,
            content_bytes,
        })
    }
}

fn summary_from_row(row: &sqlx::sqlite::SqliteRow) -> RepositorySummary {
    RepositorySummary {
        id: row.get("id"),
        owner: row.get("owner"),
        name: row.get("name"),
        branch: row.get("branch"),
        description: row.get("description"),
        file_count: row.get("file_count"),
        indexed_at: row.get("indexed_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[tokio::test]
    async fn upsert_repository_is_race_safe_per_key() -> Result<()> {
        let store = IndexStore::open_memory().await?;

        let first = store.upsert_repository("acme", "widgets", "main").await?;
        let second = store.upsert_repository("acme", "widgets", "main").await?;
        assert_eq!(first, second);

        // A different branch is a different repository
        let other = store.upsert_repository("acme", "widgets", "dev").await?;
        assert_ne!(first, other);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_path_in_one_call_overwrites() -> Result<()> {
        let store = IndexStore::open_memory().await?;
        let repo = store.upsert_repository("acme", "widgets", "main").await?;

        let files = vec![
            NewFile::from_content("src/lib.rs".into(), "old".into()),
            NewFile::from_content("src/lib.rs".into(), "new".into()),
        ];
        store.upsert_files(repo, &files).await?;

        let hits = store
            .candidate_files(&["new".to_string()], None)
            .await?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, "new");
        Ok(())
    }

    #[tokio::test]
    async fn delete_repository_cascades_to_files() -> Result<()> {
        let store = IndexStore::open_memory().await?;
        let repo = store.upsert_repository("acme", "widgets", "main").await?;
        store
            .upsert_files(
                repo,
                &[NewFile::from_content(
                    "src/zeta.rs".into(),
                    "unique_zeta_token".into(),
                )],
            )
            .await?;

        assert!(store.delete_repository(repo).await?);
        assert!(store.list_repositories().await?.is_empty());
        let hits = store
            .candidate_files(&["unique_zeta_token".to_string()], None)
            .await?;
        assert!(hits.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn stale_files_are_pruned_after_reindex() -> Result<()> {
        let store = IndexStore::open_memory().await?;
        let repo = store.upsert_repository("acme", "widgets", "main").await?;

        store
            .upsert_files(
                repo,
                &[
                    NewFile::from_content("keep.rs".into(), "keep".into()),
                    NewFile::from_content("gone.rs".into(), "gone".into()),
                ],
            )
            .await?;
        let removed = store
            .remove_stale_files(repo, &["keep.rs".to_string()])
            .await?;
        assert_eq!(removed, 1);

        let hits = store.candidate_files(&["gone".to_string()], None).await?;
        assert!(hits.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn description_absence_stays_null() -> Result<()> {
        let store = IndexStore::open_memory().await?;
        let repo = store.upsert_repository("acme", "widgets", "main").await?;
        store.set_repository_metadata(repo, None, 0).await?;

        let summary = store.get_repository(repo).await?.expect("repository row");
        assert_eq!(summary.description, None);
        Ok(())
    }

    #[test]
    fn new_file_derives_name_and_extension() {
        let file = NewFile::from_content("src/Parser.RS".into(), "x".into());
        assert_eq!(file.name, "Parser.RS");
        assert_eq!(file.extension.as_deref(), Some("rs"));

        let bare = NewFile::from_content("Makefile".into(), "x".into());
        assert_eq!(bare.extension, None);

        let dotfile = NewFile::from_content(".gitignore".into(), "x".into());
        assert_eq!(dotfile.extension, None);
    }
}
