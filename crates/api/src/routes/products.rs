//! Catalog endpoints.

use axum::{Router, extract::State, routing::get};
use serde::Deserialize;
use tracing::instrument;

use souq_core::forms::product::{ProductForm, ProductPatch};
use souq_core::forms::{ValidationErrors, Violation};
use souq_core::{Money, Product, ProductId, ProductStatus, StoreId};

use super::extract::{Json, PageParams, Path, Query};
use crate::db::Direction;
use crate::db::products::{ProductFilter, ProductSort};
use crate::error::Result;
use crate::middleware::{OptionalUser, RequireSeller, RequireUser};
use crate::response::{ApiResponse, Deleted, Paginated};
use crate::services::ProductService;
use crate::state::AppState;

/// Build the `/api/products` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(remove))
}

/// Catalog filters; pagination comes from [`PageParams`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductQuery {
    pub store_id: Option<StoreId>,
    pub category: Option<String>,
    pub status: Option<ProductStatus>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

impl ProductQuery {
    fn into_filter(self) -> std::result::Result<ProductFilter, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let sort = match self.sort.as_deref() {
            None => ProductSort::default(),
            Some(s) => s.parse().unwrap_or_else(|_| {
                errors.add("sort", Violation::InvalidFormat);
                ProductSort::default()
            }),
        };
        let direction = match self.order.as_deref() {
            None => Direction::Desc,
            Some(s) => s.parse().unwrap_or_else(|_| {
                errors.add("order", Violation::InvalidFormat);
                Direction::Desc
            }),
        };
        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            errors.add(
                "maxPrice",
                Violation::MustExceed {
                    other: "minPrice".to_string(),
                },
            );
        }

        errors.finish(ProductFilter {
            store_id: self.store_id,
            category: self.category.filter(|c| !c.trim().is_empty()),
            status: self.status.unwrap_or_default(),
            min_price: self.min_price,
            max_price: self.max_price,
            sort,
            direction,
        })
    }
}

/// GET /api/products
#[instrument(skip_all)]
async fn list(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Query(page): Query<PageParams>,
    Query(query): Query<ProductQuery>,
) -> Result<ApiResponse<Paginated<Product>>> {
    let filter = query.into_filter()?;
    let listing = ProductService::new(&state)
        .list(viewer.as_ref(), filter, page.limit(), page.cursor()?)
        .await?;
    Ok(ApiResponse::ok(listing.into()))
}

/// GET /api/products/{id}
async fn show(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Path(id): Path<ProductId>,
) -> Result<ApiResponse<Product>> {
    let product = ProductService::new(&state).view(&id, viewer.as_ref()).await?;
    Ok(ApiResponse::ok(product))
}

/// POST /api/products
async fn create(
    State(state): State<AppState>,
    RequireSeller(actor): RequireSeller,
    Json(form): Json<ProductForm>,
) -> Result<ApiResponse<Product>> {
    let new = form.validate()?;
    let product = ProductService::new(&state).create(&actor, new).await?;
    Ok(ApiResponse::created(product))
}

/// PATCH /api/products/{id}
async fn update(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<ProductId>,
    Json(patch): Json<ProductPatch>,
) -> Result<ApiResponse<Product>> {
    let product = ProductService::new(&state).update(&actor, &id, patch).await?;
    Ok(ApiResponse::ok(product))
}

/// DELETE /api/products/{id}
async fn remove(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<ProductId>,
) -> Result<ApiResponse<Deleted>> {
    ProductService::new(&state).delete(&actor, &id).await?;
    Ok(ApiResponse::ok(Deleted::YES))
}
