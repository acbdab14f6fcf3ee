//! GitHub-related errors.

use thiserror::Error;

/// Errors that can occur when talking to the GitHub Contents API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// HTTP request failed.
    #[error("GitHub request failed: {0}")]
    Request(String),

    /// GitHub answered with a non-success status.
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("GitHub response error: {0}")]
    Response(String),
}
