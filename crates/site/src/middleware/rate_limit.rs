//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: login/logout/session endpoints (~10/min, burst 10)
//! - `api_rate_limiter`: mutating content and upload endpoints (~60/min, burst 30)
//!
//! These complement the per-IP failed-login throttle, which only counts
//! wrong passwords.

use std::net::IpAddr;
use std::sync::Arc;

use axum::http::{HeaderName, Request};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use super::client_ip::{peer_addr, resolve_client_ip};

/// Key extractor using the same client IP resolution as the login throttle.
#[derive(Debug, Clone)]
pub struct ClientIpKeyExtractor {
    trusted_header: Option<HeaderName>,
}

impl ClientIpKeyExtractor {
    /// Key by connection address, or by `trusted_header` when set.
    #[must_use]
    pub const fn new(trusted_header: Option<HeaderName>) -> Self {
        Self { trusted_header }
    }
}

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(resolve_client_ip(
            req.headers(),
            peer_addr(req.extensions()),
            self.trusted_header.as_ref(),
        ))
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// # Panics
///
/// This function will not panic: `per_second(6)` and `burst_size(10)` are
/// valid positive values.
#[must_use]
pub fn auth_rate_limiter(trusted_header: Option<HeaderName>) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trusted_header))
        .per_second(6) // Replenish 1 token every 6 seconds
        .burst_size(10)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(10) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Create rate limiter for mutating API endpoints: ~60 requests per minute per IP.
///
/// # Panics
///
/// This function will not panic: `per_second(1)` and `burst_size(30)` are
/// valid positive values.
#[must_use]
pub fn api_rate_limiter(trusted_header: Option<HeaderName>) -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor::new(trusted_header))
        .per_second(1)
        .burst_size(30)
        .finish()
        .expect("rate limiter config with per_second(1) and burst_size(30) is valid");
    GovernorLayer::new(Arc::new(config))
}
