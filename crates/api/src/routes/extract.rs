//! Extractors whose rejections render as the error envelope.

use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;

use crate::db::Cursor;
use crate::db::document::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::error::{AppError, Result};

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

/// Query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

/// `?limit=&cursor=` shared by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub cursor: Option<String>,
}

impl PageParams {
    /// Page size clamped to `1..=100`, default 20.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    /// The decoded cursor.
    ///
    /// # Errors
    ///
    /// Returns a 400 when the cursor is not one this API issued.
    pub fn cursor(&self) -> Result<Option<Cursor>> {
        self.cursor
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(Cursor::decode)
            .transpose()
            .map_err(|e| AppError::Database(e.into()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_limit_bounds() {
        let params = |limit| PageParams {
            limit,
            cursor: None,
        };
        assert_eq!(params(None).limit(), 20);
        assert_eq!(params(Some(0)).limit(), 1);
        assert_eq!(params(Some(500)).limit(), 100);
        assert_eq!(params(Some(35)).limit(), 35);
    }

    #[test]
    fn test_cursor_decoding() {
        let cursor = Cursor {
            value: json!("2026-01-01T00:00:00.000000Z"),
            id: "p1".to_string(),
        };
        let params = PageParams {
            limit: None,
            cursor: Some(cursor.encode()),
        };
        assert_eq!(params.cursor().unwrap(), Some(cursor));

        let bad = PageParams {
            limit: None,
            cursor: Some("not-a-cursor".to_string()),
        };
        assert_eq!(bad.cursor().unwrap_err().status(), StatusCode::BAD_REQUEST);
    }
}
