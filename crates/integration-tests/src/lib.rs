//! Integration tests for the Souq API.
//!
//! Each test spawns the real router on an ephemeral port and talks to it over
//! HTTP with a cookie-keeping client, one client per account.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory backend, no services needed
//! cargo test -p souq-integration-tests
//!
//! # Also run the PostgreSQL suite
//! SOUQ_TEST_DATABASE_URL=postgres://localhost/souq_test \
//!     cargo test -p souq-integration-tests -- --include-ignored
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};

use souq_api::config::ApiConfig;
use souq_api::db::{DocumentStore, MemoryDocumentStore};
use souq_api::services::AuthService;
use souq_api::state::AppState;
use souq_core::forms::account::Registration;
use souq_core::{Email, UserRole};

/// Password used for every account the helpers create.
pub const PASSWORD: &str = "correct-horse-battery";

/// A running API server.
pub struct TestApp {
    pub base_url: String,
    pub documents: Arc<dyn DocumentStore>,
}

/// A logged-in client.
pub struct Actor {
    pub client: Client,
    pub id: String,
}

impl TestApp {
    /// Serve the API from process memory.
    pub async fn spawn() -> Self {
        Self::spawn_with(Arc::new(MemoryDocumentStore::new())).await
    }

    /// Serve the API from `documents`.
    pub async fn spawn_with(documents: Arc<dyn DocumentStore>) -> Self {
        let state = AppState::new(ApiConfig::for_memory(), Arc::clone(&documents));
        let app = souq_api::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Test server failed");
        });

        Self {
            base_url: format!("http://{addr}"),
            documents,
        }
    }

    /// Absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Register a customer or seller account; the client keeps its session.
    pub async fn signup(&self, email: &str, account_type: &str) -> Actor {
        let client = client();
        let (status, body) = send(client.post(self.url("/api/auth/register")).json(&json!({
            "email": email,
            "password": PASSWORD,
            "name": email.split('@').next().unwrap_or(email),
            "accountType": account_type,
        })))
        .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        Actor {
            client,
            id: body["data"]["id"].as_str().expect("user id").to_string(),
        }
    }

    /// Create an admin directly in the store and log in as them.
    pub async fn admin(&self) -> Actor {
        let email = "admin@souq.test";
        let user = AuthService::new(self.documents.as_ref())
            .register(Registration {
                email: Email::parse(email).expect("valid email"),
                password: PASSWORD.to_string(),
                name: "Admin".to_string(),
                phone: None,
                role: UserRole::Admin,
                preferred_locale: None,
            })
            .await
            .expect("Failed to create admin");

        let client = client();
        let (status, body) = send(
            client
                .post(self.url("/api/auth/login"))
                .json(&json!({ "email": email, "password": PASSWORD })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        Actor {
            client,
            id: user.id.to_string(),
        }
    }

    /// Open a store for `seller` and have `admin` approve it.
    pub async fn open_store(&self, seller: &Actor, admin: &Actor, slug: &str) -> String {
        let (status, body) = send(seller.client.post(self.url("/api/stores")).json(&json!({
            "name": { "ar": "متجر تجريبي", "en": "Test Store" },
            "slug": slug,
            "shippingFee": 10,
        })))
        .await;
        assert_eq!(status, StatusCode::CREATED, "store create failed: {body}");
        let store_id = body["data"]["id"].as_str().expect("store id").to_string();

        let (status, body) = send(
            admin
                .client
                .patch(self.url(&format!("/api/stores/{store_id}/status")))
                .json(&json!({ "status": "active" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "store approval failed: {body}");
        store_id
    }

    /// List an active product in the seller's store.
    pub async fn add_product(&self, seller: &Actor, name: &str, price: u32, stock: i64) -> String {
        let (status, body) = send(seller.client.post(self.url("/api/products")).json(&json!({
            "name": { "ar": name, "en": name },
            "category": "food",
            "price": price,
            "stock": stock,
            "status": "active",
        })))
        .await;
        assert_eq!(status, StatusCode::CREATED, "product create failed: {body}");
        body["data"]["id"].as_str().expect("product id").to_string()
    }
}

/// A client that stores session cookies.
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Send a request and decode the JSON envelope.
pub async fn send(request: reqwest::RequestBuilder) -> (StatusCode, Value) {
    let response = request.send().await.expect("Request failed");
    decode(response).await
}

/// Status and JSON body of a response.
pub async fn decode(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = response.json::<Value>().await.expect("Body is not JSON");
    (status, body)
}

/// A shipping address that passes validation.
pub fn address() -> Value {
    json!({
        "fullName": "Layla Hassan",
        "phone": "+966 55 000 1111",
        "city": "Jeddah",
        "street": "Tahlia St 12",
    })
}
