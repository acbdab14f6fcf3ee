//! Client IP resolution.
//!
//! Proxy headers are client-controlled unless a proxy in front of the site
//! overwrites them, so exactly one header is trusted, and only when
//! `TRUSTED_PROXY_HEADER` names it. Otherwise the connection address is used.

use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, HeaderName, request::Parts},
};

use crate::state::AppState;

/// Resolve the client IP from the trusted header, then the connection address.
///
/// A trusted header holding a list (`x-forwarded-for`) yields its last entry,
/// the one appended by the trusted proxy; entries before it are whatever the
/// client sent.
///
/// Falls back to `0.0.0.0` when neither is available (e.g. in-process tests),
/// so such clients share one rate-limit bucket instead of being rejected.
#[must_use]
pub fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trusted_header: Option<&HeaderName>,
) -> IpAddr {
    trusted_header
        .and_then(|name| headers.get(name))
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.rsplit(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
        .or_else(|| peer.map(|addr| addr.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Connection address recorded by `into_make_service_with_connect_info`.
pub(crate) fn peer_addr(extensions: &axum::http::Extensions) -> Option<SocketAddr> {
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// Extractor for the resolved client IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(resolve_client_ip(
            &parts.headers,
            peer_addr(&parts.extensions),
            state.config().trusted_proxy_header.as_ref(),
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_untrusted_headers_are_ignored() {
        let map = headers(&[
            ("cf-connecting-ip", "198.51.100.1"),
            ("x-forwarded-for", "203.0.113.9"),
            ("x-real-ip", "203.0.113.10"),
        ]);
        let peer: SocketAddr = "192.0.2.4:5555".parse().unwrap();

        assert_eq!(resolve_client_ip(&map, Some(peer), None), ip("192.0.2.4"));
    }

    #[test]
    fn test_only_the_configured_header_is_trusted() {
        let map = headers(&[
            ("cf-connecting-ip", "198.51.100.1"),
            ("x-vercel-forwarded-for", "203.0.113.9"),
        ]);
        let trusted = HeaderName::from_static("x-vercel-forwarded-for");

        assert_eq!(
            resolve_client_ip(&map, None, Some(&trusted)),
            ip("203.0.113.9")
        );
    }

    #[test]
    fn test_forwarded_list_uses_proxy_entry() {
        let map = headers(&[("x-forwarded-for", "10.9.9.9, 198.51.100.77, 203.0.113.9")]);
        let trusted = HeaderName::from_static("x-forwarded-for");

        assert_eq!(
            resolve_client_ip(&map, None, Some(&trusted)),
            ip("203.0.113.9")
        );
    }

    #[test]
    fn test_missing_or_invalid_trusted_header_falls_back_to_peer() {
        let trusted = HeaderName::from_static("x-real-ip");
        let peer: SocketAddr = "[2001:db8::1]:443".parse().unwrap();

        let invalid = headers(&[("x-real-ip", "unknown")]);
        assert_eq!(
            resolve_client_ip(&invalid, Some(peer), Some(&trusted)),
            ip("2001:db8::1")
        );
        assert_eq!(
            resolve_client_ip(&HeaderMap::new(), Some(peer), Some(&trusted)),
            ip("2001:db8::1")
        );
    }

    #[test]
    fn test_no_peer_is_unspecified() {
        assert_eq!(
            resolve_client_ip(&HeaderMap::new(), None, None),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );
    }
}
