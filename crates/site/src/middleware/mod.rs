//! HTTP middleware stack for the site.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (new hub per request, HTTP context)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame and sniffing protection)
//! 5. Rate limiting (governor) on auth and mutating API routes

pub mod auth;
pub mod client_ip;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;

pub use auth::{OptionalAdmin, RequireAdmin, SESSION_COOKIE};
pub use client_ip::ClientIp;
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
