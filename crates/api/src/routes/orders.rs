//! Order endpoints.

use axum::{
    Router,
    extract::State,
    routing::{get, patch},
};
use serde::Deserialize;
use tracing::instrument;

use souq_core::forms::ValidationErrors;
use souq_core::forms::checkout::CheckoutForm;
use souq_core::{Order, OrderId, OrderStatus, StoreId, UserId};

use super::extract::{Json, PageParams, Path, Query};
use crate::db::orders::OrderFilter;
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireUser};
use crate::response::{ApiResponse, Deleted, Paginated};
use crate::services::{CheckoutService, OrderScope, OrderService};
use crate::state::AppState;

/// Longest accepted status note.
const MAX_NOTE_LENGTH: usize = 500;

/// Build the `/api/orders` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(checkout))
        .route("/{id}", get(show).delete(remove))
        .route("/{id}/status", patch(update_status))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OrderQuery {
    /// `purchases` lists the caller's own orders whatever the role.
    view: Option<String>,
    status: Option<OrderStatus>,
    store_id: Option<StoreId>,
    user_id: Option<UserId>,
}

#[derive(Debug, Deserialize)]
struct StatusForm {
    status: OrderStatus,
    #[serde(default)]
    note: Option<String>,
}

/// GET /api/orders
async fn list(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Query(page): Query<PageParams>,
    Query(query): Query<OrderQuery>,
) -> Result<ApiResponse<Paginated<Order>>> {
    let scope = match query.view.as_deref() {
        Some("purchases") => OrderScope::Purchases,
        _ => OrderScope::Role,
    };
    let filter = OrderFilter {
        user_id: query.user_id,
        store_id: query.store_id,
        status: query.status,
    };
    let listing = OrderService::new(&state)
        .list(&actor, scope, filter, page.limit(), page.cursor()?)
        .await?;
    Ok(ApiResponse::ok(listing.into()))
}

/// Place an order from a cart.
///
/// POST /api/orders
#[instrument(skip_all, fields(user_id = %buyer.id))]
async fn checkout(
    State(state): State<AppState>,
    RequireUser(buyer): RequireUser,
    Json(form): Json<CheckoutForm>,
) -> Result<ApiResponse<Order>> {
    let checkout = form.validate()?;
    let order = CheckoutService::new(&state)
        .place_order(&buyer, checkout)
        .await?;
    Ok(ApiResponse::created(order))
}

/// GET /api/orders/{id}
async fn show(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<OrderId>,
) -> Result<ApiResponse<Order>> {
    let order = OrderService::new(&state).get(&actor, &id).await?;
    Ok(ApiResponse::ok(order))
}

/// PATCH /api/orders/{id}/status
async fn update_status(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<OrderId>,
    Json(form): Json<StatusForm>,
) -> Result<ApiResponse<Order>> {
    let mut errors = ValidationErrors::new();
    let note = errors.optional_text("note", form.note.as_deref(), MAX_NOTE_LENGTH);
    let note = errors.finish(note)?;

    let order = OrderService::new(&state)
        .update_status(&actor, &id, form.status, note)
        .await?;
    Ok(ApiResponse::ok(order))
}

/// DELETE /api/orders/{id}
async fn remove(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<OrderId>,
) -> Result<ApiResponse<Deleted>> {
    OrderService::new(&state).delete(&id).await?;
    Ok(ApiResponse::ok(Deleted::YES))
}
