//! Admin login, logout and session state.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::json_body;
use crate::error::{AppError, Result};
use crate::middleware::auth::{removal_cookie, session_cookie};
use crate::middleware::{ClientIp, OptionalAdmin};
use crate::services::auth::{AuthError, verify_password};
use crate::state::AppState;

/// Body of `POST /api/auth/login`.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

/// Session state returned by every auth endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Check the admin password and start a session.
///
/// POST /api/auth/login
///
/// # Errors
///
/// Returns 429 while the client is locked out, 401 on a wrong password.
#[instrument(skip(state, body), fields(ip = %ip))]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let request = json_body(body)?;

    state
        .throttle()
        .check(ip)
        .await
        .map_err(|retry_after| AuthError::Throttled { retry_after })?;

    let hash = state.config().admin_password_hash.clone();
    let password = request.password;
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))?;

    if let Err(e) = verified {
        state.throttle().record_failure(ip).await;
        warn!("Failed admin login");
        return Err(e.into());
    }

    state.throttle().reset(ip).await;

    let token = state
        .signer()
        .issue(Utc::now())
        .map_err(AuthError::from)?;
    let cookie = session_cookie(
        token.token,
        state.signer().ttl(),
        state.config().is_secure(),
    );

    info!(expires_at = %token.expires_at, "Admin logged in");

    Ok((
        AppendHeaders([(SET_COOKIE, cookie.to_string())]),
        Json(SessionResponse {
            authenticated: true,
            expires_at: Some(token.expires_at),
        }),
    ))
}

/// End the session by clearing the cookie.
///
/// Tokens are stateless, so a copied token stays valid until it expires.
///
/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = removal_cookie(state.config().is_secure());
    (
        AppendHeaders([(SET_COOKIE, cookie.to_string())]),
        Json(SessionResponse {
            authenticated: false,
            expires_at: None,
        }),
    )
}

/// Report whether the request carries a valid session.
///
/// GET /api/auth/session
pub async fn session(OptionalAdmin(claims): OptionalAdmin) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: claims.is_some(),
        expires_at: claims.and_then(|c| c.expires_at()),
    })
}
