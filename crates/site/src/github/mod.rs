//! GitHub Contents API client.
//!
//! Uploaded images are committed to a separate content repository so they
//! are versioned and served from a CDN independently of the site.

mod error;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

pub use error::GitHubError;

use crate::config::GitHubConfig;

/// REST API version pinned for every request.
const API_VERSION: &str = "2022-11-28";

/// User agent required by the GitHub API.
const USER_AGENT: &str = concat!("staffline-site/", env!("CARGO_PKG_VERSION"));

/// A file committed to the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedFile {
    /// Path inside the repository.
    pub path: String,
    /// Blob SHA of the new file content.
    pub sha: String,
    /// Public URL of the file.
    pub url: String,
}

/// GitHub Contents API client bound to one repository and branch.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubConfig,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: ContentsEntry,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

impl GitHubClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Repository as `owner/repo`.
    #[must_use]
    pub fn repository(&self) -> String {
        format!("{}/{}", self.config.owner, self.config.repo)
    }

    /// Public URL of a file in the repository.
    ///
    /// Uses the configured public base URL, else `raw.githubusercontent.com`.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        self.config.public_base_url.as_ref().map_or_else(
            || {
                format!(
                    "https://raw.githubusercontent.com/{}/{}/{}/{path}",
                    self.config.owner, self.config.repo, self.config.branch
                )
            },
            |base| format!("{base}/{path}"),
        )
    }

    /// Origin of public file URLs, for the content security policy.
    #[must_use]
    pub fn public_origin(&self) -> String {
        self.config
            .public_base_url
            .as_deref()
            .and_then(|base| url::Url::parse(base).ok())
            .map_or_else(
                || "https://raw.githubusercontent.com".to_string(),
                |url| url.origin().ascii_serialization(),
            )
    }

    /// SHA of an existing file, or `None` if the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or GitHub returns an error other than 404.
    #[instrument(skip(self))]
    pub async fn file_sha(&self, path: &str) -> Result<Option<String>, GitHubError> {
        let mut url = url::Url::parse(&self.contents_url(path))
            .map_err(|e| GitHubError::Request(e.to_string()))?;
        url.query_pairs_mut().append_pair("ref", &self.config.branch);

        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| GitHubError::Request(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let entry: ContentsEntry = parse_response(response).await?;
        Ok(Some(entry.sha))
    }

    /// Create or update a file on the configured branch.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or GitHub rejects the commit.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn put_file(
        &self,
        path: &str,
        bytes: &[u8],
        message: &str,
    ) -> Result<CommittedFile, GitHubError> {
        let sha = self.file_sha(path).await?;

        let body = PutContents {
            message,
            content: BASE64.encode(bytes),
            branch: &self.config.branch,
            sha,
        };

        let response = self
            .authorized(self.client.put(self.contents_url(path)))
            .json(&body)
            .send()
            .await
            .map_err(|e| GitHubError::Request(e.to_string()))?;

        let result: PutContentsResponse = parse_response(response).await?;

        debug!(sha = %result.content.sha, "File committed to GitHub");

        Ok(CommittedFile {
            path: path.to_string(),
            sha: result.content.sha,
            url: self.public_url(path),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{path}",
            self.config.api_url, self.config.owner, self.config.repo
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(self.config.token.expose_secret())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, GitHubError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        error!(status = status.as_u16(), message = %message, "GitHub API error");
        return Err(GitHubError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| GitHubError::Response(e.to_string()))
}
