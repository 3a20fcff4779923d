//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness
//! GET    /health/ready                - Readiness (document store ping)
//!
//! # Accounts (strict rate limit)
//! POST   /api/auth/register           - Register and log in
//! POST   /api/auth/login              - Log in
//! POST   /api/auth/logout             - Log out
//! GET    /api/auth/me                 - Current account
//! PATCH  /api/auth/me                 - Update profile
//!
//! # Catalog
//! GET    /api/products                - List (filters, sort, cursor)
//! POST   /api/products                - Create (seller/admin)
//! GET    /api/products/{id}           - Read, counting a view
//! PATCH  /api/products/{id}           - Update (store owner/admin)
//! DELETE /api/products/{id}           - Delete (store owner/admin)
//!
//! # Stores
//! GET    /api/stores                  - List active stores
//! POST   /api/stores                  - Open a store
//! GET    /api/stores/{id}             - Read
//! PATCH  /api/stores/{id}             - Update (owner/admin)
//! DELETE /api/stores/{id}             - Delete (admin)
//! PATCH  /api/stores/{id}/status      - Approve or suspend (admin)
//!
//! # Orders
//! GET    /api/orders                  - List by role, or ?view=purchases
//! POST   /api/orders                  - Checkout
//! GET    /api/orders/{id}             - Read (buyer, store owner, admin)
//! PATCH  /api/orders/{id}/status      - Status transition
//! DELETE /api/orders/{id}             - Delete (admin)
//!
//! # Coupons
//! GET    /api/coupons                 - List (seller/admin)
//! POST   /api/coupons                 - Create
//! POST   /api/coupons/validate        - Quote a discount (public)
//! GET    /api/coupons/{id}            - Read
//! PATCH  /api/coupons/{id}            - Update
//! DELETE /api/coupons/{id}            - Delete
//!
//! # Reviews
//! GET    /api/reviews                 - List by productId or userId
//! POST   /api/reviews                 - Create
//! PATCH  /api/reviews/{id}            - Update (author)
//! DELETE /api/reviews/{id}            - Delete (author/admin)
//!
//! # Wishlist
//! GET    /api/wishlist                - Saved products
//! POST   /api/wishlist                - Save a product
//! DELETE /api/wishlist/{productId}    - Remove
//!
//! # Admin
//! GET    /api/admin/stats             - Dashboard counters
//! ```

pub mod admin;
pub mod auth;
pub mod coupons;
pub mod extract;
pub mod health;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod stores;
pub mod wishlist;

use axum::Router;

use crate::state::AppState;

/// Every `/api` route except `/api/auth`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/stores", stores::router())
        .nest("/orders", orders::router())
        .nest("/coupons", coupons::router())
        .nest("/reviews", reviews::router())
        .nest("/wishlist", wishlist::router())
        .nest("/admin", admin::router())
}

/// The `/api/auth` routes.
pub fn auth_routes() -> Router<AppState> {
    auth::router()
}
