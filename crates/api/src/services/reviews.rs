//! Reviews and the rating aggregates they feed.
//!
//! Every write recomputes the mean rating and count on both the product and
//! its store from the stored reviews, so aggregates never drift from a
//! running sum.

use tracing::{info, instrument, warn};

use souq_core::forms::review::{NewReview, ReviewChanges};
use souq_core::models::RatingSummary;
use souq_core::{ProductId, Review, ReviewId, StoreId, Timestamp};

use crate::db::{OrderRepository, ProductRepository, ReviewRepository, StoreRepository};
use crate::error::{AppError, Entity, Result, add_breadcrumb, messages};
use crate::middleware::CurrentUser;
use crate::state::AppState;

use super::StoreService;

/// Review operations.
pub struct ReviewService<'a> {
    state: &'a AppState,
    reviews: ReviewRepository<'a>,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            reviews: ReviewRepository::new(state.documents()),
        }
    }

    async fn require(&self, id: &ReviewId) -> Result<Review> {
        self.reviews
            .get(id)
            .await?
            .ok_or(AppError::NotFound(Entity::Review))
    }

    /// Post a review. One per author and product.
    ///
    /// The review is marked as a verified purchase when the author has a
    /// delivered order containing the product.
    ///
    /// # Errors
    ///
    /// - `AppError::NotFound` when the product does not exist
    /// - `AppError::Conflict` when the author already reviewed it
    #[instrument(skip(self, author, new), fields(product_id = %new.product_id))]
    pub async fn create(&self, author: &CurrentUser, new: NewReview) -> Result<Review> {
        let product = ProductRepository::new(self.state.documents())
            .get(&new.product_id)
            .await?
            .ok_or(AppError::NotFound(Entity::Product))?;

        if self
            .reviews
            .get_by_author(&author.id, &product.id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(messages::ALREADY_REVIEWED));
        }

        let verified_purchase = OrderRepository::new(self.state.documents())
            .has_delivered(&author.id, &product.id)
            .await?;

        let now = Timestamp::now();
        let review = self
            .reviews
            .create(&Review {
                id: ReviewId::generate(),
                product_id: product.id,
                store_id: product.store_id,
                user_id: author.id.clone(),
                user_name: author.name.clone(),
                rating: new.rating,
                comment: new.comment,
                verified_purchase,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.refresh_aggregates(&review.product_id, &review.store_id)
            .await;
        add_breadcrumb(
            "reviews",
            "Review posted",
            Some(&[("review_id", review.id.as_str())]),
        );
        info!(review_id = %review.id, verified_purchase, "Review posted");
        Ok(review)
    }

    /// Edit a review. Only its author may.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` or `AppError::Forbidden`.
    pub async fn update(
        &self,
        actor: &CurrentUser,
        id: &ReviewId,
        changes: &ReviewChanges,
    ) -> Result<Review> {
        let review = self.require(id).await?;
        if review.user_id != actor.id {
            return Err(AppError::Forbidden);
        }
        let updated = self
            .reviews
            .update(id, changes)
            .await?
            .ok_or(AppError::NotFound(Entity::Review))?;
        if changes.rating.is_some() {
            self.refresh_aggregates(&updated.product_id, &updated.store_id)
                .await;
        }
        Ok(updated)
    }

    /// Remove a review. The author or an admin may.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` or `AppError::Forbidden`.
    pub async fn delete(&self, actor: &CurrentUser, id: &ReviewId) -> Result<()> {
        let review = self.require(id).await?;
        if review.user_id != actor.id && !actor.is_admin() {
            return Err(AppError::Forbidden);
        }
        if !self.reviews.delete(id).await? {
            return Err(AppError::NotFound(Entity::Review));
        }
        self.refresh_aggregates(&review.product_id, &review.store_id)
            .await;
        Ok(())
    }

    /// Recompute product and store ratings. Failures are logged; the review
    /// write has already succeeded.
    async fn refresh_aggregates(&self, product_id: &ProductId, store_id: &StoreId) {
        if let Err(e) = self.try_refresh(product_id, store_id).await {
            warn!(%product_id, %store_id, error = %e, "Rating aggregate refresh failed");
        }
    }

    async fn try_refresh(&self, product_id: &ProductId, store_id: &StoreId) -> Result<()> {
        let product_ratings = self.reviews.ratings_for_product(product_id).await?;
        ProductRepository::new(self.state.documents())
            .set_rating(product_id, RatingSummary::from_ratings(product_ratings))
            .await?;

        let store_ratings = self.reviews.ratings_for_store(store_id).await?;
        StoreRepository::new(self.state.documents())
            .set_rating(store_id, RatingSummary::from_ratings(store_ratings))
            .await?;
        StoreService::new(self.state).invalidate(store_id).await;
        Ok(())
    }
}
