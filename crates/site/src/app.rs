//! Router assembly.

use axum::{
    Router,
    http::{HeaderValue, Request, Response, header::CACHE_CONTROL},
    middleware::{from_fn, from_fn_with_state},
};
use tower::ServiceBuilder;
use tower_http::{
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tracing::Span;

use crate::middleware::{request_id_middleware, security_headers_middleware};
use crate::routes;
use crate::state::AppState;
use crate::storage::LOCAL_MEDIA_PREFIX;

/// Static assets are fingerprinted with `?v=<hash>`, so they can be cached long.
const STATIC_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Locally stored media changes in place when re-uploaded.
const MEDIA_CACHE_CONTROL: &str = "public, max-age=300";

/// Build the complete application router with all layers applied.
pub fn build_router(state: AppState) -> Router {
    let config = state.config();

    let static_files = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static(STATIC_CACHE_CONTROL),
        ))
        .service(ServeDir::new(&config.static_dir));

    let mut router = routes::routes(config).nest_service("/static", static_files);

    // The local backend has no public URLs of its own.
    if let Some(root) = state.content().store().local_root() {
        let media = ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                CACHE_CONTROL,
                HeaderValue::from_static(MEDIA_CACHE_CONTROL),
            ))
            .service(ServeDir::new(root));
        router = router.nest_service(LOCAL_MEDIA_PREFIX, media);
    }

    router
        .layer(from_fn_with_state(state.clone(), security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &Response<_>, latency: std::time::Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}
