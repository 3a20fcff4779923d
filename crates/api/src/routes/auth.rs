//! Account endpoints.
//!
//! Registration and login cycle the session id before storing the account
//! snapshot, so a session fixed before login is never promoted.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use souq_core::User;
use souq_core::forms::account::{LoginForm, ProfileForm, RegisterForm};

use super::extract::Json;
use crate::db::UserRepository;
use crate::error::{AppError, Entity, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{CurrentUser, RequireUser, clear_current_user, set_current_user};
use crate::response::ApiResponse;
use crate::services::AuthService;
use crate::state::AppState;

/// Build the `/api/auth` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me).patch(update_me))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoggedOut {
    logged_out: bool,
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    session.cycle_id().await?;
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create an account and log it in.
///
/// POST /api/auth/register
#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<RegisterForm>,
) -> Result<ApiResponse<User>> {
    let registration = form.validate()?;
    let user = AuthService::new(state.documents())
        .register(registration)
        .await?;
    start_session(&session, &user).await?;
    info!(user_id = %user.id, role = %user.role, "Account registered");
    Ok(ApiResponse::created(user))
}

/// POST /api/auth/login
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<ApiResponse<User>> {
    let credentials = form.validate()?;
    let user = AuthService::new(state.documents())
        .login(&credentials)
        .await?;
    start_session(&session, &user).await?;
    info!(user_id = %user.id, "Logged in");
    Ok(ApiResponse::ok(user))
}

/// POST /api/auth/logout
///
/// Succeeds with or without a session.
async fn logout(session: Session) -> Result<ApiResponse<LoggedOut>> {
    clear_current_user(&session).await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(ApiResponse::ok(LoggedOut { logged_out: true }))
}

/// The logged-in account, read fresh from the store.
///
/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<ApiResponse<User>> {
    let user = UserRepository::new(state.documents())
        .get(&current.id)
        .await?
        .ok_or(AppError::NotFound(Entity::User))?;
    Ok(ApiResponse::ok(user))
}

/// Update name, phone or preferred locale.
///
/// PATCH /api/auth/me
#[instrument(skip_all, fields(user_id = %current.id))]
async fn update_me(
    State(state): State<AppState>,
    session: Session,
    RequireUser(current): RequireUser,
    Json(form): Json<ProfileForm>,
) -> Result<ApiResponse<User>> {
    let changes = form.validate()?;
    let user = UserRepository::new(state.documents())
        .update_profile(&current.id, &changes)
        .await?
        .ok_or(AppError::NotFound(Entity::User))?;
    set_current_user(&session, &CurrentUser::from(&user)).await?;
    Ok(ApiResponse::ok(user))
}
