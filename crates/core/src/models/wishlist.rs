//! Wishlist entries.

use serde::{Deserialize, Serialize};

use crate::types::{ProductId, Timestamp, UserId, WishlistItemId};

/// A product saved by a shopper.
///
/// The ID is derived from the (user, product) pair, see
/// [`WishlistItemId::for_pair`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: Timestamp,
}

impl WishlistItem {
    /// New wishlist entry stamped with the current time.
    #[must_use]
    pub fn new(user_id: UserId, product_id: ProductId) -> Self {
        Self {
            id: WishlistItemId::for_pair(&user_id, &product_id),
            user_id,
            product_id,
            created_at: Timestamp::now(),
        }
    }
}
