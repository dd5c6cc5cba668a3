//! Authenticated GitHub API session.
//!
//! A [`GithubSession`] is created by validating a token against the identity
//! endpoint and is then passed explicitly into the crawler, fetcher, and
//! indexing engine. The session lives only in memory: there is no persisted
//! credential state, dropping the session is logout, and nothing survives a
//! process restart.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{RepoHost, RepoInfo, TreeEntry};
use crate::error::{IndexError, Result};

const USER_AGENT: &str = concat!("lodestone-indexer/", env!("CARGO_PKG_VERSION"));

/// Identity profile returned by the token validation call.
#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    /// Account login the token belongs to
    pub login: String,
    /// Display name, when the account has one
    pub name: Option<String>,
}

/// A validated, process-scoped GitHub API session.
#[derive(Debug, Clone)]
pub struct GithubSession {
    client: reqwest::Client,
    api_base: String,
    token: String,
    identity: Identity,
}

impl GithubSession {
    /// Validate `token` against the identity endpoint and build a session.
    ///
    /// A single synchronous validation call, no retries: failure returns
    /// [`IndexError::AuthRequired`] and leaves no partial state behind.
    pub async fn authenticate(
        client: reqwest::Client,
        api_base: &str,
        token: &str,
    ) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(IndexError::AuthRequired);
        }

        let api_base = api_base.trim_end_matches('/').to_string();
        let url = parse_url(&format!("{api_base}/user"))?;
        let response = client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .bearer_auth(token)
            .send()
            .await?;

        if let Some(err) = api_error(response.status(), response.headers()) {
            return Err(err);
        }
        let identity: Identity = response.error_for_status()?.json().await?;
        info!("authenticated to {} as {}", api_base, identity.login);

        Ok(Self {
            client,
            api_base,
            token: token.to_string(),
            identity,
        })
    }

    /// Identity the session was validated for. Reads in-memory state only.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .bearer_auth(&self.token)
    }

    fn repo_url(&self, owner: &str, name: &str, tail: &[&str]) -> Result<Url> {
        let mut url = parse_url(&self.api_base)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| IndexError::validation("API base URL cannot be a base"))?;
            segments.pop_if_empty();
            segments.extend(["repos", owner, name]);
            segments.extend(tail);
        }
        Ok(url)
    }

    async fn fetch_tree(
        &self,
        owner: &str,
        name: &str,
        reference: &str,
        recursive: bool,
    ) -> Result<GitTree> {
        let mut url = self.repo_url(owner, name, &["git", "trees", reference])?;
        if recursive {
            url.set_query(Some("recursive=1"));
        }

        let response = self
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        let response = check_repo_response(response, owner, name, Some(reference))?;
        Ok(response.error_for_status()?.json().await?)
    }
}

#[async_trait]
impl RepoHost for GithubSession {
    async fn repo_info(&self, owner: &str, name: &str) -> Result<RepoInfo> {
        let url = self.repo_url(owner, name, &[])?;
        let response = self
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        let response = check_repo_response(response, owner, name, None)?;
        Ok(response.error_for_status()?.json().await?)
    }

    async fn list_tree(&self, owner: &str, name: &str, branch: &str) -> Result<Vec<TreeEntry>> {
        let root = self.fetch_tree(owner, name, branch, true).await?;
        if !root.truncated {
            return Ok(blob_entries(root));
        }

        // The recursive listing was cut off; walk subtrees one level at a
        // time so very large repositories still list completely.
        warn!("tree listing for {owner}/{name}@{branch} truncated, walking subtrees");
        let mut entries = Vec::new();
        let mut stack: Vec<(String, String)> = vec![(String::new(), branch.to_string())];
        while let Some((prefix, reference)) = stack.pop() {
            let tree = match self.fetch_tree(owner, name, &reference, false).await {
                Ok(tree) => tree,
                Err(e) => {
                    warn!("failed to list subtree '{prefix}' of {owner}/{name}: {e}");
                    continue;
                }
            };
            for node in tree.tree {
                let path = if prefix.is_empty() {
                    node.path
                } else {
                    format!("{prefix}/{}", node.path)
                };
                match node.kind.as_str() {
                    "blob" => entries.push(TreeEntry {
                        path,
                        size: node.size.unwrap_or(0),
                    }),
                    "tree" => stack.push((path, node.sha)),
                    // Submodule commits and the like are not text files
                    _ => {}
                }
            }
        }
        Ok(entries)
    }

    async fn fetch_blob(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
        path: &str,
    ) -> Result<String> {
        let mut url = self.repo_url(owner, name, &["contents"])?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| IndexError::validation("API base URL cannot be a base"))?;
            segments.extend(path.split('/'));
        }
        url.query_pairs_mut().append_pair("ref", branch);

        debug!("fetching {owner}/{name}@{branch}:{path}");
        let response = self
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github.raw")
            .send()
            .await?;
        let response = check_repo_response(response, owner, name, Some(branch))?;
        let bytes = response.error_for_status()?.bytes().await?;

        String::from_utf8(bytes.to_vec())
            .map_err(|_| IndexError::validation(format!("{path} is not valid UTF-8 text")))
    }
}

#[derive(Debug, Deserialize)]
struct GitTree {
    tree: Vec<GitTreeNode>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct GitTreeNode {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    size: Option<u64>,
}

fn blob_entries(tree: GitTree) -> Vec<TreeEntry> {
    tree.tree
        .into_iter()
        .filter(|node| node.kind == "blob")
        .map(|node| TreeEntry {
            path: node.path,
            size: node.size.unwrap_or(0),
        })
        .collect()
}

fn parse_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| IndexError::validation(format!("invalid API URL {raw}: {e}")))
}

/// Map credential and throttling statuses onto the error taxonomy.
fn api_error(status: StatusCode, headers: &HeaderMap) -> Option<IndexError> {
    match status {
        StatusCode::UNAUTHORIZED => Some(IndexError::AuthRequired),
        StatusCode::FORBIDDEN => {
            let remaining = headers
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok());
            if remaining == Some("0") {
                let reset_at = headers
                    .get("x-ratelimit-reset")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse().ok());
                Some(IndexError::RateLimited { reset_at })
            } else {
                Some(IndexError::AuthRequired)
            }
        }
        _ => None,
    }
}

fn check_repo_response(
    response: Response,
    owner: &str,
    name: &str,
    branch: Option<&str>,
) -> Result<Response> {
    if response.status() == StatusCode::NOT_FOUND {
        return Err(IndexError::not_found(owner, name, branch));
    }
    if let Some(err) = api_error(response.status(), response.headers()) {
        return Err(err);
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (key, value) in pairs {
            map.insert(
                reqwest::header::HeaderName::from_bytes(key.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    #[test]
    fn unauthorized_maps_to_auth_required() {
        let err = api_error(StatusCode::UNAUTHORIZED, &HeaderMap::new());
        assert!(matches!(err, Some(IndexError::AuthRequired)));
    }

    #[test]
    fn exhausted_rate_limit_maps_to_rate_limited_with_reset() {
        let headers = headers(&[
            ("x-ratelimit-remaining", "0"),
            ("x-ratelimit-reset", "1700000000"),
        ]);
        match api_error(StatusCode::FORBIDDEN, &headers) {
            Some(IndexError::RateLimited { reset_at }) => {
                assert_eq!(reset_at, Some(1_700_000_000))
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn forbidden_without_exhausted_limit_is_a_credential_problem() {
        let headers = headers(&[("x-ratelimit-remaining", "31")]);
        let err = api_error(StatusCode::FORBIDDEN, &headers);
        assert!(matches!(err, Some(IndexError::AuthRequired)));
    }

    #[test]
    fn success_statuses_map_to_nothing() {
        assert!(api_error(StatusCode::OK, &HeaderMap::new()).is_none());
        assert!(api_error(StatusCode::NOT_FOUND, &HeaderMap::new()).is_none());
    }
}
