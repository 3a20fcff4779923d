//! Admin dashboard endpoints.

use std::collections::BTreeMap;

use axum::{Router, extract::State, routing::get};
use serde::Serialize;

use souq_core::{OrderStatus, ProductStatus, StoreStatus, UserRole};

use crate::db::{OrderRepository, ProductRepository, StoreRepository, UserRepository};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Build the `/api/admin` router.
pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(stats))
}

/// Marketplace counters.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Stores per status.
    pub stores: BTreeMap<&'static str, u64>,
    pub active_products: u64,
    /// Orders per status.
    pub orders: BTreeMap<&'static str, u64>,
    pub users: UserCounts,
}

#[derive(Debug, Serialize)]
pub struct UserCounts {
    pub total: u64,
    pub customers: u64,
    pub sellers: u64,
    pub admins: u64,
}

/// GET /api/admin/stats
async fn stats(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<ApiResponse<Stats>> {
    let documents = state.documents();

    let store_repo = StoreRepository::new(documents);
    let mut stores = BTreeMap::new();
    for status in StoreStatus::ALL {
        stores.insert(status.as_str(), store_repo.count_by_status(status).await?);
    }

    let order_repo = OrderRepository::new(documents);
    let mut orders = BTreeMap::new();
    for status in OrderStatus::ALL {
        orders.insert(status.as_str(), order_repo.count_by_status(status).await?);
    }

    let active_products = ProductRepository::new(documents)
        .count_by_status(ProductStatus::Active)
        .await?;

    let user_repo = UserRepository::new(documents);
    let users = UserCounts {
        total: user_repo.count(None).await?,
        customers: user_repo.count(Some(UserRole::Customer)).await?,
        sellers: user_repo.count(Some(UserRole::Seller)).await?,
        admins: user_repo.count(Some(UserRole::Admin)).await?,
    };

    Ok(ApiResponse::ok(Stats {
        stores,
        active_products,
        orders,
        users,
    }))
}
