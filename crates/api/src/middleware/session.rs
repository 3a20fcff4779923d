//! Session middleware configuration.
//!
//! Sessions are stored in the `sessions` collection of the document store.

use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::ApiConfig;
use crate::db::DocumentSessionStore;
use crate::state::AppState;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "souq_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer over the application's document store.
#[must_use]
pub fn create_session_layer(
    state: &AppState,
    config: &ApiConfig,
) -> SessionManagerLayer<DocumentSessionStore> {
    let store = DocumentSessionStore::new(state.documents_handle());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
