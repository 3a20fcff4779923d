//! Store endpoints.

use axum::{
    Router,
    extract::State,
    routing::{get, patch},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::info;

use souq_core::forms::store::{StoreForm, StorePatch, StoreStatusForm};
use souq_core::{Store, StoreId, StoreStatus};

use super::extract::{Json, PageParams, Path, Query};
use crate::db::StoreRepository;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::{OptionalUser, RequireAdmin, RequireUser, set_current_user};
use crate::response::{ApiResponse, Deleted, Paginated};
use crate::services::StoreService;
use crate::state::AppState;

/// Build the `/api/stores` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(remove))
        .route("/{id}/status", patch(set_status))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoreQuery {
    status: Option<StoreStatus>,
}

/// Active stores, newest first. Admins may list any status, or all of them
/// by passing no status.
///
/// GET /api/stores
async fn list(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Query(page): Query<PageParams>,
    Query(query): Query<StoreQuery>,
) -> Result<ApiResponse<Paginated<Store>>> {
    let status = if viewer.as_ref().is_some_and(|v| v.is_admin()) {
        query.status
    } else {
        Some(StoreStatus::Active)
    };
    let listing = StoreRepository::new(state.documents())
        .list(status, page.limit(), page.cursor()?)
        .await?;
    Ok(ApiResponse::ok(listing.into()))
}

/// GET /api/stores/{id}
async fn show(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Path(id): Path<StoreId>,
) -> Result<ApiResponse<Store>> {
    let store = StoreService::new(&state)
        .visible(&id, viewer.as_ref())
        .await?;
    Ok(ApiResponse::ok(store))
}

/// Open a store. A customer becomes a seller; the session is refreshed so
/// the new role applies to the next request.
///
/// POST /api/stores
async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireUser(mut actor): RequireUser,
    Json(form): Json<StoreForm>,
) -> Result<ApiResponse<Store>> {
    let new = form.validate()?;
    let (store, role) = StoreService::new(&state).create(&actor, new).await?;
    if role != actor.role {
        actor.role = role;
        set_current_user(&session, &actor).await?;
        info!(user_id = %actor.id, role = %role, "Account promoted");
    }
    add_breadcrumb(
        "stores",
        "Store created",
        Some(&[("store_id", store.id.as_str())]),
    );
    Ok(ApiResponse::created(store))
}

/// PATCH /api/stores/{id}
async fn update(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<StoreId>,
    Json(patch): Json<StorePatch>,
) -> Result<ApiResponse<Store>> {
    let changes = patch.validate()?;
    let store = StoreService::new(&state)
        .update(&actor, &id, &changes)
        .await?;
    Ok(ApiResponse::ok(store))
}

/// PATCH /api/stores/{id}/status
async fn set_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<StoreId>,
    Json(form): Json<StoreStatusForm>,
) -> Result<ApiResponse<Store>> {
    let store = StoreService::new(&state).set_status(&id, form.status).await?;
    Ok(ApiResponse::ok(store))
}

/// DELETE /api/stores/{id}
async fn remove(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<StoreId>,
) -> Result<ApiResponse<Deleted>> {
    StoreService::new(&state).delete(&id).await?;
    Ok(ApiResponse::ok(Deleted::YES))
}
