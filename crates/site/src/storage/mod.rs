//! Blob storage for content documents and uploaded media.
//!
//! Two backends share one API:
//! - [`VercelBlobClient`] talks to the Vercel Blob REST API (production).
//! - [`LocalBlobStore`] keeps blobs in a directory (development, tests, CLI exports).
//!
//! Blob paths are relative, `/`-separated and never contain `..`.

mod local;
mod vercel;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use local::LocalBlobStore;
pub use vercel::VercelBlobClient;

use crate::config::StorageConfig;

/// URL prefix under which the local backend's blobs are served.
pub const LOCAL_MEDIA_PREFIX: &str = "/media";

/// Errors that can occur when talking to blob storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The blob path is absolute, empty or escapes the store.
    #[error("invalid blob path: {0:?}")]
    InvalidPath(String),

    /// Local filesystem error.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed.
    #[error("blob request failed: {0}")]
    Request(String),

    /// The blob API answered with a non-success status.
    #[error("blob API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("blob response error: {0}")]
    Response(String),
}

/// A blob as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobObject {
    /// Relative path inside the store.
    pub pathname: String,
    /// Public URL of the blob.
    pub url: String,
    /// Size in bytes.
    pub size: u64,
    /// Last upload time, when the backend reports it.
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Blob storage backend.
#[derive(Debug, Clone)]
pub enum BlobStore {
    /// Vercel Blob REST API.
    Vercel(VercelBlobClient),
    /// Directory on the local filesystem.
    Local(LocalBlobStore),
}

impl BlobStore {
    /// Build the backend selected by the configuration.
    #[must_use]
    pub fn from_config(config: &StorageConfig) -> Self {
        match config {
            StorageConfig::Vercel { api_url, token } => {
                Self::Vercel(VercelBlobClient::new(api_url.clone(), token.clone()))
            }
            StorageConfig::Local { root } => Self::Local(LocalBlobStore::new(root.clone())),
        }
    }

    /// Short backend name for logs and health output.
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Vercel(_) => "vercel-blob",
            Self::Local(_) => "local",
        }
    }

    /// Root directory of the local backend, if active.
    #[must_use]
    pub fn local_root(&self) -> Option<&Path> {
        match self {
            Self::Local(store) => Some(store.root()),
            Self::Vercel(_) => None,
        }
    }

    /// Read a blob. A missing blob is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the backend fails.
    pub async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = validate_path(path)?;
        match self {
            Self::Vercel(client) => client.get(path).await,
            Self::Local(store) => store.get(path).await,
        }
    }

    /// Write a blob, overwriting any existing one. Returns its public URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is invalid or the backend fails.
    pub async fn put(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let path = validate_path(path)?;
        match self {
            Self::Vercel(client) => client.put(path, bytes, content_type).await,
            Self::Local(store) => store.put(path, &bytes).await,
        }
    }

    /// List blobs whose path starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>, StorageError> {
        match self {
            Self::Vercel(client) => client.list(prefix).await,
            Self::Local(store) => store.list(prefix).await,
        }
    }

    /// Check that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    pub async fn ping(&self) -> Result<(), StorageError> {
        match self {
            Self::Vercel(client) => client.ping().await,
            Self::Local(store) => store.ping().await,
        }
    }
}

/// Check that a blob path is relative and stays inside the store.
///
/// # Errors
///
/// Returns [`StorageError::InvalidPath`] for empty or absolute paths,
/// backslashes, and empty, `.` or `..` segments.
pub fn validate_path(path: &str) -> Result<&str, StorageError> {
    let invalid = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");

    if invalid {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(path)
}
