//! Subcommand implementations.

pub mod check;
pub mod export;
pub mod migrate;
pub mod password;

use std::path::PathBuf;
use std::time::Duration;

use staffline_core::{ContentType, ValidationError};
use staffline_site::config::StorageConfig;
use staffline_site::services::auth::AuthError;
use staffline_site::services::content::{ContentError, ContentService};
use staffline_site::storage::BlobStore;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Filesystem access failed.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source file is not JSON.
    #[error("{path}: invalid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A document violates the content rules.
    #[error("{content_type}: {source}")]
    Invalid {
        content_type: ContentType,
        #[source]
        source: ValidationError,
    },

    /// Reading or writing the blob store failed.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// `check` found problems.
    #[error("{0} document(s) failed the check")]
    CheckFailed(usize),

    /// Password hashing failed.
    #[error(transparent)]
    Password(#[from] AuthError),
}

impl CliError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Content service over the blob store configured in the environment.
///
/// Commands always go to storage: the read cache only lives for a second.
pub fn content_service() -> ContentService {
    let storage = StorageConfig::from_env();
    let store = BlobStore::from_config(&storage);
    tracing::info!(backend = store.backend(), "Using blob store");
    ContentService::new(store, Duration::from_secs(1))
}
