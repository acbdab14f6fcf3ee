//! Unified error handling with Sentry integration.
//!
//! API handlers return `Result<T, AppError>`. Every error becomes a JSON body
//! `{"error": "<message>"}` with a matching status; server-side failures are
//! captured to Sentry and their details are never sent to the client.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::content::ContentError;
use crate::services::upload::UploadError;

/// Application-level error type for the site.
#[derive(Debug, Error)]
pub enum AppError {
    /// Content read or write failed.
    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    /// Image upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Authentication failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Content(err) => match err {
                ContentError::Validation(_) | ContentError::Malformed(_) => StatusCode::BAD_REQUEST,
                ContentError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                ContentError::Storage(_) => StatusCode::BAD_GATEWAY,
                ContentError::Encoding(_) | ContentError::Serialize(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Upload(err) => match err {
                UploadError::MissingFile
                | UploadError::Empty
                | UploadError::UnsupportedType(_)
                | UploadError::ContentMismatch
                | UploadError::InvalidFolder(_)
                | UploadError::Decode(_) => StatusCode::BAD_REQUEST,
                UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                UploadError::GitHub(_) | UploadError::Storage(_) => StatusCode::BAD_GATEWAY,
                UploadError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
                AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::Token(_) | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            // Don't expose internal error details to clients
            return if status == StatusCode::BAD_GATEWAY {
                "Storage service unavailable".to_string()
            } else {
                "Internal server error".to_string()
            };
        }

        match self {
            Self::Content(err) => err.to_string(),
            Self::Upload(err) => err.to_string(),
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_string(),
            Self::Auth(AuthError::Throttled { .. }) => {
                "Too many login attempts, please try again later".to_string()
            }
            Self::Auth(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg)
            | Self::Internal(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = Json(json!({ "error": self.public_message(status) }));
        let mut response = (status, body).into_response();

        if let Self::Auth(AuthError::Throttled { retry_after }) = &self {
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for admin actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
