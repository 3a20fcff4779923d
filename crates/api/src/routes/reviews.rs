//! Review endpoints.

use axum::{
    Router,
    extract::State,
    routing::{get, patch},
};
use serde::Deserialize;

use souq_core::forms::review::{ReviewForm, ReviewPatch};
use souq_core::forms::{ValidationErrors, Violation};
use souq_core::{ProductId, Review, ReviewId, UserId};

use super::extract::{Json, PageParams, Path, Query};
use crate::db::ReviewRepository;
use crate::error::{AppError, Result};
use crate::middleware::{OptionalUser, RequireUser};
use crate::response::{ApiResponse, Deleted, Paginated};
use crate::services::ReviewService;
use crate::state::AppState;

/// Build the `/api/reviews` router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", patch(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ReviewQuery {
    product_id: Option<ProductId>,
    user_id: Option<UserId>,
}

/// Reviews of a product (public) or by a user (that user or an admin).
///
/// GET /api/reviews
async fn list(
    State(state): State<AppState>,
    OptionalUser(viewer): OptionalUser,
    Query(page): Query<PageParams>,
    Query(query): Query<ReviewQuery>,
) -> Result<ApiResponse<Paginated<Review>>> {
    let reviews = ReviewRepository::new(state.documents());
    let listing = match (query.product_id, query.user_id) {
        (Some(product_id), _) => {
            reviews
                .list_for_product(&product_id, page.limit(), page.cursor()?)
                .await?
        }
        (None, Some(user_id)) => {
            let viewer = viewer.ok_or(AppError::Unauthorized)?;
            if viewer.id != user_id && !viewer.is_admin() {
                return Err(AppError::Forbidden);
            }
            reviews
                .list_for_user(&user_id, page.limit(), page.cursor()?)
                .await?
        }
        (None, None) => {
            return Err(ValidationErrors::single("productId", Violation::Required).into());
        }
    };
    Ok(ApiResponse::ok(listing.into()))
}

/// POST /api/reviews
async fn create(
    State(state): State<AppState>,
    RequireUser(author): RequireUser,
    Json(form): Json<ReviewForm>,
) -> Result<ApiResponse<Review>> {
    let new = form.validate()?;
    let review = ReviewService::new(&state).create(&author, new).await?;
    Ok(ApiResponse::created(review))
}

/// PATCH /api/reviews/{id}
async fn update(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<ReviewId>,
    Json(patch): Json<ReviewPatch>,
) -> Result<ApiResponse<Review>> {
    let changes = patch.validate()?;
    let review = ReviewService::new(&state)
        .update(&actor, &id, &changes)
        .await?;
    Ok(ApiResponse::ok(review))
}

/// DELETE /api/reviews/{id}
async fn remove(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<ReviewId>,
) -> Result<ApiResponse<Deleted>> {
    ReviewService::new(&state).delete(&actor, &id).await?;
    Ok(ApiResponse::ok(Deleted::YES))
}
