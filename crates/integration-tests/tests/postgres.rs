//! The same flows against `PostgreSQL`.
//!
//! Requires a scratch database in `SOUQ_TEST_DATABASE_URL`. Migrations are
//! applied on connect and every collection is truncated first.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::SecretString;
use serde_json::json;

use souq_api::db::{self, DocumentStore, PgDocumentStore};
use souq_integration_tests::{TestApp, address, client, send};

async fn spawn_pg() -> TestApp {
    let url = std::env::var("SOUQ_TEST_DATABASE_URL")
        .expect("SOUQ_TEST_DATABASE_URL must point at a scratch database");
    let pool = db::create_pool(&SecretString::from(url)).await.unwrap();
    sqlx::migrate!("../api/migrations").run(&pool).await.unwrap();
    sqlx::query("TRUNCATE documents").execute(&pool).await.unwrap();

    let documents: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool));
    TestApp::spawn_with(documents).await
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SOUQ_TEST_DATABASE_URL)"]
async fn test_pg_session_and_uniqueness() {
    let app = spawn_pg().await;
    let shopper = app.signup("pg-user@example.com", "customer").await;

    let (status, _) = send(shopper.client.get(app.url("/api/auth/me"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(client().post(app.url("/api/auth/register")).json(&json!({
        "email": "pg-user@example.com",
        "password": "another-password",
        "name": "Copy",
    })))
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "email_taken");
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (SOUQ_TEST_DATABASE_URL)"]
async fn test_pg_catalog_pagination_and_checkout() {
    let app = spawn_pg().await;
    let admin = app.admin().await;
    let seller = app.signup("pg-seller@example.com", "seller").await;
    let store_id = app.open_store(&seller, &admin, "pg-store").await;

    // Equal prices exercise the id tie-break.
    let mut ids = Vec::new();
    for name in ["a", "b", "c", "d"] {
        ids.push(app.add_product(&seller, name, 10, 5).await);
    }
    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut url = app.url(&format!("/api/products?storeId={store_id}&sort=price&limit=3"));
        if let Some(c) = cursor.take() {
            url.push_str(&format!("&cursor={c}"));
        }
        let (status, body) = send(client().get(url)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        for item in body["data"]["items"].as_array().unwrap() {
            seen.push(item["id"].as_str().unwrap().to_string());
        }
        match body["data"]["nextCursor"].as_str() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }
    seen.sort();
    ids.sort();
    assert_eq!(seen, ids);

    let buyer = app.signup("pg-buyer@example.com", "customer").await;
    let (status, body) = send(buyer.client.post(app.url("/api/orders")).json(&json!({
        "storeId": store_id,
        "items": [{ "productId": ids[0], "quantity": 2 }],
        "shippingAddress": address(),
    })))
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (_, body) = send(client().get(app.url(&format!("/api/products/{}", ids[0])))).await;
    assert_eq!(body["data"]["stock"], 3);
    assert_eq!(body["data"]["sales"], 2);
    assert_eq!(body["data"]["views"], 1);
}
