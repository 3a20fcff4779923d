//! Wishlist endpoints for the logged-in account.

use axum::{
    Router,
    extract::State,
    routing::{delete, get},
};
use serde::{Deserialize, Serialize};

use souq_core::{Product, ProductId, WishlistItem};

use super::extract::{Json, PageParams, Path, Query};
use crate::db::{ProductRepository, WishlistRepository};
use crate::error::{AppError, Entity, Result};
use crate::middleware::RequireUser;
use crate::response::{ApiResponse, Deleted, Paginated};
use crate::state::AppState;

/// Build the `/api/wishlist` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(add))
        .route("/{product_id}", delete(remove))
}

/// A saved item with its product, when the product still exists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    #[serde(flatten)]
    pub item: WishlistItem,
    pub product: Option<Product>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddForm {
    product_id: ProductId,
}

/// GET /api/wishlist
async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Query(page): Query<PageParams>,
) -> Result<ApiResponse<Paginated<WishlistEntry>>> {
    let listing = WishlistRepository::new(state.documents())
        .list(&user.id, page.limit(), page.cursor()?)
        .await?;

    let products = ProductRepository::new(state.documents());
    let mut entries = Vec::with_capacity(listing.items.len());
    for item in listing.items {
        let product = products.get(&item.product_id).await?;
        entries.push(WishlistEntry { item, product });
    }
    Ok(ApiResponse::ok(Paginated {
        items: entries,
        next_cursor: listing.next_cursor.map(|c| c.encode()),
    }))
}

/// Save a product. Saving it again returns the existing item with 200.
///
/// POST /api/wishlist
async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(form): Json<AddForm>,
) -> Result<ApiResponse<WishlistItem>> {
    ProductRepository::new(state.documents())
        .get(&form.product_id)
        .await?
        .ok_or(AppError::NotFound(Entity::Product))?;

    let (item, created) = WishlistRepository::new(state.documents())
        .add(&user.id, &form.product_id)
        .await?;
    Ok(if created {
        ApiResponse::created(item)
    } else {
        ApiResponse::ok(item)
    })
}

/// DELETE /api/wishlist/{productId}
async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(product_id): Path<ProductId>,
) -> Result<ApiResponse<Deleted>> {
    let removed = WishlistRepository::new(state.documents())
        .remove(&user.id, &product_id)
        .await?;
    if removed {
        Ok(ApiResponse::ok(Deleted::YES))
    } else {
        Err(AppError::NotFound(Entity::WishlistItem))
    }
}
