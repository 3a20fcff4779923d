//! Souq marketplace API.
//!
//! A bilingual (Arabic/English) JSON API for a multi-store marketplace:
//! catalog, stores, checkout with coupons, order fulfilment, reviews,
//! wishlists and an admin dashboard. Persistence goes through the
//! [`db::DocumentStore`] trait, backed by `PostgreSQL` JSONB in production
//! and by process memory in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use std::time::Duration;

use axum::http::{HeaderValue, Method, Request, Response, header};
use axum::{Router, middleware::from_fn, middleware::from_fn_with_state};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::{Span, warn};

use crate::config::ApiConfig;
use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, create_session_layer, locale_middleware,
    request_id_middleware,
};
use crate::state::AppState;

/// Build the full application router with every middleware layer.
///
/// Layers, outermost first: Sentry, `TraceLayer`, request id, locale, CORS,
/// session. Rate limits wrap the `/api/auth` and `/api` groups separately.
pub fn app(state: AppState) -> Router {
    let config = state.config().clone();

    let mut auth = routes::auth_routes();
    let mut api = routes::api_routes();
    if config.rate_limit {
        if let Some(limiter) = auth_rate_limiter() {
            auth = auth.layer(limiter);
        }
        if let Some(limiter) = api_rate_limiter() {
            api = api.layer(limiter);
        }
    }

    let mut router = Router::new()
        .merge(routes::health::router())
        .nest("/api/auth", auth)
        .nest("/api", api)
        .layer(create_session_layer(&state, &config));

    if let Some(cors) = cors_layer(&config) {
        router = router.layer(cors);
    }

    router
        .layer(from_fn_with_state(state.clone(), locale_middleware))
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
                .on_response(|response: &Response<_>, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                    DefaultOnResponse::default().on_response(response, latency, span);
                }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// CORS for the configured origins; `None` when no origin is configured.
fn cors_layer(config: &ApiConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT_LANGUAGE])
            .expose_headers([header::CONTENT_LANGUAGE])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600)),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_needs_origins() {
        let mut config = ApiConfig::for_memory();
        assert!(cors_layer(&config).is_none());
        config.cors_origins = vec!["https://souq.example".to_string(), "bad\norigin".to_string()];
        assert!(cors_layer(&config).is_some());
    }
}
