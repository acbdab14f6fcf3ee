//! Security headers middleware.
//!
//! The content security policy is locked down to same-origin resources, plus
//! the remote origins uploaded images are served from (GitHub content
//! repository or Vercel Blob). Admin-authored HTML is rendered unescaped, so
//! `script-src 'self'` is what keeps injected inline scripts inert.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Build the CSP for the given extra image origins.
#[must_use]
pub fn content_security_policy(image_origins: &[String]) -> String {
    let mut img_src = String::from("'self' data:");
    for origin in image_origins {
        img_src.push(' ');
        img_src.push_str(origin);
    }

    format!(
        "default-src 'none'; \
         script-src 'self'; \
         style-src 'self'; \
         font-src 'self'; \
         img-src {img_src}; \
         connect-src 'self'; \
         frame-src 'none'; \
         object-src 'none'; \
         base-uri 'self'; \
         form-action 'self'; \
         frame-ancestors 'none'"
    )
}

/// Add security headers to all responses.
///
/// `Cache-Control: no-store` is only applied when the handler did not set
/// its own caching policy (static files, sitemap).
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(
        REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if let Ok(csp) = HeaderValue::from_str(&content_security_policy(state.image_origins())) {
        headers.insert(CONTENT_SECURITY_POLICY, csp);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "camera=(), geolocation=(), microphone=(), payment=(), usb=(), interest-cohort=()",
        ),
    );

    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csp_includes_image_origins() {
        let csp = content_security_policy(&["https://raw.githubusercontent.com".to_string()]);
        assert!(csp.contains("img-src 'self' data: https://raw.githubusercontent.com;"));
        assert!(csp.contains("script-src 'self';"));
    }

    #[test]
    fn test_csp_without_remote_origins() {
        let csp = content_security_policy(&[]);
        assert!(csp.contains("img-src 'self' data:;"));
    }
}
