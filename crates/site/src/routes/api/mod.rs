//! JSON API routes, mounted under `/api`.
//!
//! Auth endpoints sit behind the auth rate limiter. Mutating endpoints require
//! an admin session and sit behind the API rate limiter; reads are public.

pub mod auth;
pub mod content;
pub mod upload;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, rejection::JsonRejection},
    handler::Handler,
    routing::{get, post},
};

use crate::config::SiteConfig;
use crate::error::{AppError, Result};
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Extra room for multipart framing on top of the image size limit.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Unwrap a JSON body, turning extractor rejections into JSON 400 errors.
pub(crate) fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Auth routes, mounted under `/api/auth`.
fn auth_routes(config: &SiteConfig) -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::session))
        .layer(auth_rate_limiter(config.trusted_proxy_header.clone()))
}

/// Create the API router.
pub fn router(config: &SiteConfig) -> Router<AppState> {
    let upload_limit = config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);
    let limiter = || api_rate_limiter(config.trusted_proxy_header.clone());

    Router::new()
        .route(
            "/content-clean",
            get(content::get_content).post(content::save_content.layer(limiter())),
        )
        .route(
            "/content-html",
            get(content::get_html).post(content::save_html.layer(limiter())),
        )
        .route(
            "/upload",
            post(
                upload::upload
                    .layer(limiter())
                    .layer(DefaultBodyLimit::max(upload_limit)),
            ),
        )
        .nest("/auth", auth_routes(config))
        .fallback(not_found)
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
