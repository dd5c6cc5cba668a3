//! Error types for indexing operations.

/// Result type for indexing operations.
///
/// Convenience alias using [`IndexError`] as the error type, used throughout
/// the crate for operations that can fail.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Error type for all indexing and search operations.
///
/// Repository-level failures (missing credentials, unknown repository,
/// external throttling) abort the whole index call and surface through this
/// enum. Per-file fetch failures are *not* represented here: they are
/// swallowed and aggregated into [`IndexOutcome`](crate::index::engine::IndexOutcome)
/// counts so partial success stays distinguishable from total failure.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Credentials are missing, expired, or rejected by the remote API
    #[error("GitHub credentials are missing or invalid")]
    AuthRequired,

    /// The requested owner/name/branch does not resolve
    #[error("repository not found: {reference}")]
    NotFound { reference: String },

    /// The remote API is throttling us; the caller must back off
    #[error("GitHub API rate limit exceeded")]
    RateLimited {
        /// Unix timestamp at which the limit window resets, when reported
        reset_at: Option<i64>,
    },

    /// Malformed caller input (empty owner, slash in a name, blank query)
    #[error("invalid input: {message}")]
    Validation { message: String },

    /// Transport-level HTTP failures
    #[error("HTTP request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// SQLite storage failures
    #[error("database error: {source}")]
    Database {
        #[from]
        source: sqlx::Error,
    },
}

impl IndexError {
    /// Create a [`IndexError::NotFound`] for a repository reference.
    ///
    /// The branch is included when the caller knows which branch failed to
    /// resolve; a bare `owner/name` reference is used for preflight checks.
    pub fn not_found(owner: &str, name: &str, branch: Option<&str>) -> Self {
        let reference = match branch {
            Some(branch) => format!("{owner}/{name}@{branch}"),
            None => format!("{owner}/{name}"),
        };
        Self::NotFound { reference }
    }

    /// Create a [`IndexError::Validation`] with a custom message.
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
