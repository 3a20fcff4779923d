//! Coupon endpoints.
//!
//! Management is limited to the owning seller and admins; `validate` is
//! public so a cart can preview its discount before checkout.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;

use souq_core::forms::coupon::{CouponForm, CouponPatch, ValidateCouponForm};
use souq_core::{Coupon, CouponId, CouponStatus, StoreId};

use super::extract::{Json, PageParams, Path, Query};
use crate::db::CouponRepository;
use crate::error::{AppError, Result};
use crate::middleware::{CurrentUser, RequireSeller};
use crate::response::{ApiResponse, Deleted, Paginated};
use crate::services::stores::can_manage;
use crate::services::{CouponService, CouponValidation, StoreService};
use crate::state::AppState;

/// Build the `/api/coupons` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/validate", post(validate))
        .route("/{id}", get(show).patch(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CouponQuery {
    store_id: Option<StoreId>,
    status: Option<CouponStatus>,
}

/// A coupon the actor may manage.
async fn managed_coupon(state: &AppState, actor: &CurrentUser, id: &CouponId) -> Result<Coupon> {
    let coupon = CouponService::new(state).require(id).await?;
    if actor.is_admin() {
        return Ok(coupon);
    }
    let store = StoreService::new(state).require(&coupon.store_id).await?;
    if can_manage(actor, &store) {
        Ok(coupon)
    } else {
        Err(AppError::Forbidden)
    }
}

/// GET /api/coupons
async fn list(
    State(state): State<AppState>,
    RequireSeller(actor): RequireSeller,
    Query(page): Query<PageParams>,
    Query(query): Query<CouponQuery>,
) -> Result<ApiResponse<Paginated<Coupon>>> {
    let store_id = if actor.is_admin() {
        query.store_id
    } else {
        let store = StoreService::new(&state)
            .managed_by(&actor, query.store_id.as_ref())
            .await?;
        Some(store.id)
    };
    let listing = CouponRepository::new(state.documents())
        .list(store_id.as_ref(), query.status, page.limit(), page.cursor()?)
        .await?;
    Ok(ApiResponse::ok(listing.into()))
}

/// POST /api/coupons
async fn create(
    State(state): State<AppState>,
    RequireSeller(actor): RequireSeller,
    Json(form): Json<CouponForm>,
) -> Result<ApiResponse<Coupon>> {
    let new = form.validate()?;
    let store = StoreService::new(&state)
        .managed_by(&actor, new.store_id.as_ref())
        .await?;
    let coupon = CouponService::new(&state).create(&store, new).await?;
    Ok(ApiResponse::created(coupon))
}

/// Check a code against a cart and quote the discount.
///
/// POST /api/coupons/validate
async fn validate(
    State(state): State<AppState>,
    Json(form): Json<ValidateCouponForm>,
) -> Result<ApiResponse<CouponValidation>> {
    let check = form.validate()?;
    let result = CouponService::new(&state).validate(&check).await?;
    Ok(ApiResponse::ok(result))
}

/// GET /api/coupons/{id}
async fn show(
    State(state): State<AppState>,
    RequireSeller(actor): RequireSeller,
    Path(id): Path<CouponId>,
) -> Result<ApiResponse<Coupon>> {
    let coupon = managed_coupon(&state, &actor, &id).await?;
    Ok(ApiResponse::ok(coupon))
}

/// PATCH /api/coupons/{id}
async fn update(
    State(state): State<AppState>,
    RequireSeller(actor): RequireSeller,
    Path(id): Path<CouponId>,
    Json(patch): Json<CouponPatch>,
) -> Result<ApiResponse<Coupon>> {
    let current = managed_coupon(&state, &actor, &id).await?;
    let changes = patch.validate(&current)?;
    let coupon = CouponService::new(&state).update(&current, &changes).await?;
    Ok(ApiResponse::ok(coupon))
}

/// DELETE /api/coupons/{id}
async fn remove(
    State(state): State<AppState>,
    RequireSeller(actor): RequireSeller,
    Path(id): Path<CouponId>,
) -> Result<ApiResponse<Deleted>> {
    managed_coupon(&state, &actor, &id).await?;
    CouponService::new(&state).delete(&id).await?;
    Ok(ApiResponse::ok(Deleted::YES))
}
