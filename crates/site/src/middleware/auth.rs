//! Admin authentication extractors and session cookie helpers.
//!
//! A session token is accepted from the `staffline_admin` cookie (browser
//! admin panel) or an `Authorization: Bearer` header (scripts).

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde_json::json;
use tower_sessions::cookie::{Cookie, SameSite, time};
use tracing::debug;

use crate::services::auth::SessionClaims;
use crate::state::AppState;

/// Name of the admin session cookie.
pub const SESSION_COOKIE: &str = "staffline_admin";

/// Login page unauthenticated admin requests are sent to.
pub const LOGIN_PATH: &str = "/admin/login";

/// Extract the raw session token from the request headers.
///
/// A bearer token takes precedence over the cookie.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| Cookie::split_parse(v))
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Verify the session carried by a request, if any.
fn verify_session(parts: &Parts, state: &AppState) -> Option<SessionClaims> {
    let token = session_token(&parts.headers)?;
    match state.signer().verify(&token, Utc::now()) {
        Ok(claims) => Some(claims),
        Err(e) => {
            debug!(error = %e, "Rejected session token");
            None
        }
    }
}

/// Whether the request targets the JSON API.
///
/// Nested routers strip their prefix from `parts.uri`, so the original URI is
/// preferred when present.
fn is_api_request(parts: &Parts) -> bool {
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |OriginalUri(uri)| uri.path());
    path == "/api" || path.starts_with("/api/")
}

/// Build the cookie that carries a session token.
#[must_use]
pub fn session_cookie(token: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .path("/")
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// Build the cookie that clears the session.
#[must_use]
pub fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

/// Extractor that requires an authenticated admin.
///
/// API requests are rejected with `401`; page requests are redirected to the
/// login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdmin(claims): RequireAdmin) -> impl IntoResponse {
///     format!("session expires at {}", claims.exp)
/// }
/// ```
pub struct RequireAdmin(pub SessionClaims);

/// Rejection returned when an admin session is required but missing.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Authentication required" })),
            )
                .into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        verify_session(parts, state).map(Self).ok_or_else(|| {
            if is_api_request(parts) {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::RedirectToLogin
            }
        })
    }
}

/// Extractor that optionally gets the admin session.
pub struct OptionalAdmin(pub Option<SessionClaims>);

impl FromRequestParts<AppState> for OptionalAdmin {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(verify_session(parts, state)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; staffline_admin=abc.def; other=1"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_bearer_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("staffline_admin=cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header"));
        assert_eq!(session_token(&headers).as_deref(), Some("header"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("staffline_admin="));
        assert_eq!(session_token(&headers), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok".to_string(), Duration::from_secs(3600), true).to_string();
        assert!(cookie.starts_with("staffline_admin=tok"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn test_removal_cookie_expires() {
        let cookie = removal_cookie(false).to_string();
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }
}
