//! Success envelope.
//!
//! `{ "success": true, "data": ... }`, with paginated lists as
//! `data: { items, nextCursor }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::db::Listing;

/// A successful response wrapping `data`.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    data: T,
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// `200 OK`.
    pub const fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    /// `201 Created`.
    pub const fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Envelope {
            success: true,
            data: self.data,
        };
        (self.status, Json(body)).into_response()
    }
}

/// One page of a list endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> From<Listing<T>> for Paginated<T> {
    fn from(listing: Listing<T>) -> Self {
        Self {
            items: listing.items,
            next_cursor: listing.next_cursor.map(|c| c.encode()),
        }
    }
}

/// `data` for deletions.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

impl Deleted {
    pub const YES: Self = Self { deleted: true };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::db::Cursor;

    #[test]
    fn test_paginated_encodes_cursor() {
        let listing = Listing {
            items: vec![1, 2],
            next_cursor: Some(Cursor {
                value: json!(2),
                id: "b".to_string(),
            }),
        };
        let page = Paginated::from(listing);
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["items"], json!([1, 2]));
        let cursor = value["nextCursor"].as_str().unwrap();
        assert_eq!(Cursor::decode(cursor).unwrap().id, "b");
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::created(json!({"id": "x"})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
