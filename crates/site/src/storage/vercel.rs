//! Vercel Blob REST API client.

use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{BlobObject, StorageError};

/// API version sent with every request.
const API_VERSION: &str = "7";

/// Page size used when listing.
const LIST_LIMIT: &str = "1000";

/// Cache lifetime requested for written blobs.
const CACHE_MAX_AGE_SECS: &str = "60";

/// Vercel Blob client.
#[derive(Clone)]
pub struct VercelBlobClient {
    client: Client,
    api_url: String,
    token: SecretString,
}

impl std::fmt::Debug for VercelBlobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VercelBlobClient")
            .field("api_url", &self.api_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PutResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    blobs: Vec<ListedBlob>,
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedBlob {
    url: String,
    pathname: String,
    #[serde(default)]
    size: u64,
    uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl VercelBlobClient {
    /// Create a new client.
    #[must_use]
    pub fn new(api_url: String, token: SecretString) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Upload a blob at a fixed pathname, overwriting any existing one.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub(super) async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let response = self
            .client
            .put(format!("{}/{path}", self.api_url))
            .bearer_auth(self.token.expose_secret())
            .header("x-api-version", API_VERSION)
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "0")
            .header("x-allow-overwrite", "1")
            .header("x-cache-control-max-age", CACHE_MAX_AGE_SECS)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let result: PutResponse = parse_response(response).await?;
        debug!(url = %result.url, "Blob uploaded");
        Ok(result.url)
    }

    /// List blobs under a prefix, following pagination.
    #[instrument(skip(self))]
    pub(super) async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>, StorageError> {
        let mut objects = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut url = url::Url::parse(&self.api_url)
                .map_err(|e| StorageError::Request(e.to_string()))?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("prefix", prefix);
                query.append_pair("limit", LIST_LIMIT);
                if let Some(cursor) = &cursor {
                    query.append_pair("cursor", cursor);
                }
            }

            let response = self
                .client
                .get(url)
                .bearer_auth(self.token.expose_secret())
                .header("x-api-version", API_VERSION)
                .send()
                .await
                .map_err(|e| StorageError::Request(e.to_string()))?;

            let page: ListResponse = parse_response(response).await?;
            objects.extend(page.blobs.into_iter().map(|blob| BlobObject {
                pathname: blob.pathname,
                url: blob.url,
                size: blob.size,
                uploaded_at: blob.uploaded_at,
            }));

            match page.cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(objects)
    }

    /// Fetch a blob by exact pathname.
    #[instrument(skip(self))]
    pub(super) async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let Some(blob) = self
            .list(path)
            .await?
            .into_iter()
            .find(|blob| blob.pathname == path)
        else {
            debug!("Blob not found");
            return Ok(None);
        };

        let response = self
            .client
            .get(&blob.url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            warn!(url = %blob.url, "Listed blob vanished before download");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(StorageError::Api {
                status: status.as_u16(),
                message: format!("download of {path} failed"),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Response(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }

    /// Cheap reachability check: a listing limited to one blob.
    pub(super) async fn ping(&self) -> Result<(), StorageError> {
        let response = self
            .client
            .get(format!("{}?limit=1", self.api_url))
            .bearer_auth(self.token.expose_secret())
            .header("x-api-version", API_VERSION)
            .send()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;
        let _: ListResponse = parse_response(response).await?;
        Ok(())
    }
}

/// Decode a JSON body, turning error statuses into [`StorageError::Api`].
async fn parse_response<T: serde::de::DeserializeOwned>(
    response: Response,
) -> Result<T, StorageError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or(body);
        return Err(StorageError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| StorageError::Response(e.to_string()))
}
