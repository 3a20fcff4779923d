//! Request locale negotiation.
//!
//! The locale is taken from the `lang` query parameter, then
//! `Accept-Language`, then the configured default. The middleware stores it
//! as a [`RequestLocale`] extension, renders error envelopes in it and sets
//! `Content-Language` on every response.

use axum::{
    body::Body,
    extract::{FromRequestParts, Query, Request, State},
    http::{HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use souq_core::Locale;

use crate::error::{AppError, ErrorPayload};
use crate::state::AppState;

/// The locale chosen for the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLocale(pub Locale);

impl<S> FromRequestParts<S> for RequestLocale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .copied()
            .unwrap_or(Self(Locale::default())))
    }
}

#[derive(Deserialize)]
struct LangQuery {
    lang: Option<String>,
}

/// Pick the locale for a request.
#[must_use]
pub fn negotiate(request: &Request, default: Locale) -> Locale {
    let from_query = Query::<LangQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.lang)
        .and_then(|lang| Locale::from_tag(&lang));

    from_query
        .or_else(|| {
            request
                .headers()
                .get(header::ACCEPT_LANGUAGE)
                .and_then(|h| h.to_str().ok())
                .and_then(Locale::from_accept_language)
        })
        .unwrap_or(default)
}

/// Middleware that negotiates the locale and localizes error bodies.
pub async fn locale_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let locale = negotiate(&request, state.config().default_locale);
    request.extensions_mut().insert(RequestLocale(locale));

    let mut response = next.run(request).await;

    // The rate limiter answers with a bare 429; give it the usual envelope.
    if response.status() == StatusCode::TOO_MANY_REQUESTS
        && response.extensions().get::<ErrorPayload>().is_none()
    {
        let limited = AppError::RateLimited.into_response();
        let (mut parts, body) = limited.into_parts();
        for name in ["retry-after", "x-ratelimit-after", "x-ratelimit-limit"] {
            if let Some(value) = response.headers().get(name) {
                parts.headers.insert(name, value.clone());
            }
        }
        response = Response::from_parts(parts, body);
    }

    if let Some(payload) = response.extensions().get::<ErrorPayload>().cloned()
        && locale != Locale::En
    {
        let (mut parts, _) = response.into_parts();
        let body = serde_json::to_vec(&payload.render(locale)).unwrap_or_default();
        parts.headers.remove(header::CONTENT_LENGTH);
        parts.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response = Response::from_parts(parts, Body::from(body));
    }

    response.headers_mut().insert(
        header::CONTENT_LANGUAGE,
        HeaderValue::from_static(locale.as_str()),
    );
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{Router, http::Request as HttpRequest, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::config::ApiConfig;
    use crate::db::MemoryDocumentStore;
    use crate::error::Entity;

    fn request(uri: &str, accept: Option<&str>) -> Request {
        let mut builder = HttpRequest::get(uri);
        if let Some(value) = accept {
            builder = builder.header(header::ACCEPT_LANGUAGE, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_negotiation_order() {
        assert_eq!(negotiate(&request("/?lang=en", Some("ar")), Locale::Ar), Locale::En);
        assert_eq!(negotiate(&request("/", Some("en-US,ar;q=0.5")), Locale::Ar), Locale::En);
        assert_eq!(negotiate(&request("/?lang=fr", None), Locale::En), Locale::En);
        assert_eq!(negotiate(&request("/", Some("de")), Locale::Ar), Locale::Ar);
    }

    fn app() -> Router {
        let state = AppState::new(
            ApiConfig::for_memory(),
            std::sync::Arc::new(MemoryDocumentStore::new()),
        );
        Router::new()
            .route(
                "/missing",
                get(|| async { AppError::NotFound(Entity::Product) }),
            )
            .route(
                "/limited",
                get(|| async { StatusCode::TOO_MANY_REQUESTS }),
            )
            .route(
                "/locale",
                get(|RequestLocale(locale): RequestLocale| async move { locale.as_str() }),
            )
            .layer(middleware::from_fn_with_state(state.clone(), locale_middleware))
            .with_state(state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_rendered_in_arabic_by_default() {
        let response = app().oneshot(request("/missing", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_LANGUAGE], "ar");
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "المنتج غير موجود");
    }

    #[tokio::test]
    async fn test_error_rendered_in_english() {
        let response = app()
            .oneshot(request("/missing", Some("en")))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Product not found");
    }

    #[tokio::test]
    async fn test_bare_429_gets_envelope() {
        let response = app().oneshot(request("/limited", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "rate_limited");
    }

    #[tokio::test]
    async fn test_extractor_sees_locale() {
        let response = app()
            .oneshot(request("/locale?lang=en", None))
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"en");
    }
}
