//! HTTP middleware stack for the API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (recorded in the span and Sentry scope)
//! 4. Locale (pick `ar`/`en`, render error envelopes, `Content-Language`)
//! 5. CORS
//! 6. Session layer (tower-sessions over the document store)
//! 7. Rate limiting (governor), per route group

pub mod auth;
pub mod locale;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{
    CurrentUser, OptionalUser, RequireAdmin, RequireSeller, RequireUser, clear_current_user,
    set_current_user,
};
pub use locale::{RequestLocale, locale_middleware};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
