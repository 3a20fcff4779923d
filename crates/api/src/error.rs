//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. The response body is the
//! failure envelope:
//!
//! ```json
//! { "success": false, "error": { "code": "not_found", "message": "...", "fields": [...] } }
//! ```
//!
//! `IntoResponse` renders the message in English and attaches an
//! [`ErrorPayload`] extension; the locale middleware re-renders it in the
//! request's language.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;

use souq_core::Locale;
use souq_core::forms::{FieldError, ValidationErrors};
use souq_core::models::{CouponRejection, TransitionError};

use crate::db::{RepositoryError, StoreError};
use crate::services::auth::AuthError;

/// A message available in both marketplace languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub ar: &'static str,
    pub en: &'static str,
}

impl Message {
    /// Pair an Arabic and an English message.
    #[must_use]
    pub const fn new(ar: &'static str, en: &'static str) -> Self {
        Self { ar, en }
    }

    /// The message in `locale`.
    #[must_use]
    pub const fn get(&self, locale: Locale) -> &'static str {
        match locale {
            Locale::Ar => self.ar,
            Locale::En => self.en,
        }
    }
}

/// Common messages.
pub mod messages {
    use super::Message;

    pub const UNAUTHORIZED: Message = Message::new("يجب تسجيل الدخول", "Login required");
    pub const FORBIDDEN: Message = Message::new(
        "ليس لديك صلاحية لهذا الإجراء",
        "You are not allowed to do this",
    );
    pub const INVALID_CREDENTIALS: Message = Message::new(
        "البريد الإلكتروني أو كلمة المرور غير صحيحة",
        "Invalid email or password",
    );
    pub const EMAIL_TAKEN: Message = Message::new(
        "يوجد حساب مسجل بهذا البريد الإلكتروني",
        "An account with this email already exists",
    );
    pub const SLUG_TAKEN: Message = Message::new(
        "رابط المتجر مستخدم بالفعل",
        "This store slug is already taken",
    );
    pub const STORE_EXISTS: Message =
        Message::new("لديك متجر بالفعل", "You already own a store");
    pub const COUPON_CODE_TAKEN: Message = Message::new(
        "رمز الكوبون مستخدم في هذا المتجر",
        "This coupon code already exists in the store",
    );
    pub const ALREADY_REVIEWED: Message = Message::new(
        "لقد قمت بتقييم هذا المنتج من قبل",
        "You have already reviewed this product",
    );
    pub const INVALID_CURSOR: Message =
        Message::new("مؤشر الصفحات غير صالح", "Invalid pagination cursor");
    pub const INVALID_BODY: Message =
        Message::new("محتوى الطلب غير صالح", "The request body is not valid JSON");
    pub const INVALID_QUERY: Message =
        Message::new("معايير البحث غير صالحة", "Invalid query parameters");
    pub const STORE_NOT_ACTIVE: Message =
        Message::new("المتجر غير متاح حاليًا", "The store is not accepting orders");
    pub const PRODUCT_UNAVAILABLE: Message = Message::new(
        "أحد المنتجات غير متاح للبيع",
        "A product in the order is not available",
    );
    pub const OUT_OF_STOCK: Message = Message::new(
        "الكمية المطلوبة غير متوفرة في المخزون",
        "Not enough stock for a product in the order",
    );
    pub const NO_STORE: Message = Message::new(
        "يجب إنشاء متجر أولاً",
        "Create a store before managing its catalog",
    );
    pub const INVALID_STORE_STATUS: Message = Message::new(
        "لا يمكن نقل المتجر إلى هذه الحالة",
        "The store cannot be moved to this status",
    );
    pub const RATE_LIMITED: Message = Message::new(
        "طلبات كثيرة، حاول لاحقًا",
        "Too many requests, try again later",
    );
    pub const INTERNAL: Message =
        Message::new("حدث خطأ في الخادم", "Internal server error");
}

/// The kind of document a 404 refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Store,
    Product,
    Order,
    Coupon,
    Review,
    WishlistItem,
}

impl Entity {
    const fn not_found(self) -> Message {
        match self {
            Self::User => Message::new("المستخدم غير موجود", "User not found"),
            Self::Store => Message::new("المتجر غير موجود", "Store not found"),
            Self::Product => Message::new("المنتج غير موجود", "Product not found"),
            Self::Order => Message::new("الطلب غير موجود", "Order not found"),
            Self::Coupon => Message::new("الكوبون غير موجود", "Coupon not found"),
            Self::Review => Message::new("التقييم غير موجود", "Review not found"),
            Self::WishlistItem => Message::new(
                "المنتج غير موجود في قائمة الأمنيات",
                "Product is not in the wishlist",
            ),
        }
    }
}

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// One or more fields failed validation.
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    /// A coupon cannot be redeemed.
    #[error("Coupon rejected: {0}")]
    Coupon(#[from] CouponRejection),

    /// An order status change the transition table forbids.
    #[error("{0}")]
    Transition(#[from] TransitionError),

    /// Repository operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session read or write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Bad request from client.
    #[error("Bad request: {}", .0.en)]
    BadRequest(Message),

    /// User is not authenticated.
    #[error("Unauthorized")]
    Unauthorized,

    /// User is authenticated but not allowed.
    #[error("Forbidden")]
    Forbidden,

    /// Resource not found.
    #[error("Not found: {0:?}")]
    NotFound(Entity),

    /// Uniqueness conflict.
    #[error("Conflict: {}", .0.en)]
    Conflict(Message),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Coupon(_) | Self::Transition(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::Store(
                    StoreError::InvalidCursor
                    | StoreError::InvalidField(_)
                    | StoreError::InvalidQuery(_),
                ) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::EmailTaken => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing body, independent of locale.
    #[must_use]
    pub fn payload(&self) -> ErrorPayload {
        let status = self.status();
        if status.is_server_error() {
            // Don't expose internal error details to clients
            return ErrorPayload::fixed("internal_error", messages::INTERNAL);
        }

        match self {
            Self::Validation(errors) => ErrorPayload {
                code: "validation_failed",
                detail: Detail::Fixed(Message::new(
                    "بعض الحقول غير صالحة",
                    "Some fields are invalid",
                )),
                fields: errors.errors().to_vec(),
            },
            Self::Coupon(rejection) => ErrorPayload {
                code: rejection.code(),
                detail: Detail::Coupon(rejection.clone()),
                fields: Vec::new(),
            },
            Self::Transition(err) => ErrorPayload {
                code: "invalid_transition",
                detail: Detail::Transition(*err),
                fields: Vec::new(),
            },
            Self::Database(RepositoryError::NotFound) => {
                ErrorPayload::fixed("not_found", Message::new("غير موجود", "Not found"))
            }
            Self::Database(RepositoryError::Conflict(_)) => ErrorPayload::fixed(
                "conflict",
                Message::new("المورد موجود بالفعل", "Resource already exists"),
            ),
            Self::Database(RepositoryError::Store(StoreError::InvalidCursor)) => {
                ErrorPayload::fixed("invalid_cursor", messages::INVALID_CURSOR)
            }
            Self::Database(_) => ErrorPayload::fixed("bad_request", messages::INVALID_QUERY),
            Self::Auth(AuthError::EmailTaken) => {
                ErrorPayload::fixed("email_taken", messages::EMAIL_TAKEN)
            }
            Self::Auth(_) => ErrorPayload::fixed("invalid_credentials", messages::INVALID_CREDENTIALS),
            Self::BadRequest(message) => ErrorPayload::fixed("bad_request", *message),
            Self::Unauthorized => ErrorPayload::fixed("unauthorized", messages::UNAUTHORIZED),
            Self::Forbidden => ErrorPayload::fixed("forbidden", messages::FORBIDDEN),
            Self::NotFound(entity) => ErrorPayload::fixed("not_found", entity.not_found()),
            Self::Conflict(message) => ErrorPayload::fixed("conflict", *message),
            Self::RateLimited => ErrorPayload::fixed("rate_limited", messages::RATE_LIMITED),
            Self::Session(_) | Self::Internal(_) => {
                ErrorPayload::fixed("internal_error", messages::INTERNAL)
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Detail {
    Fixed(Message),
    Coupon(CouponRejection),
    Transition(TransitionError),
}

/// The `error` object of a failure envelope.
#[derive(Debug, Clone)]
pub struct ErrorPayload {
    code: &'static str,
    detail: Detail,
    fields: Vec<FieldError>,
}

impl ErrorPayload {
    const fn fixed(code: &'static str, message: Message) -> Self {
        Self {
            code,
            detail: Detail::Fixed(message),
            fields: Vec::new(),
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Human-readable message in `locale`.
    #[must_use]
    pub fn message(&self, locale: Locale) -> String {
        match &self.detail {
            Detail::Fixed(message) => message.get(locale).to_string(),
            Detail::Coupon(rejection) => rejection.message(locale),
            Detail::Transition(err) => match locale {
                Locale::En => err.to_string(),
                Locale::Ar => format!(
                    "لا يمكن تغيير حالة الطلب من {} إلى {}",
                    err.from, err.to
                ),
            },
        }
    }

    /// The full failure envelope in `locale`.
    #[must_use]
    pub fn render(&self, locale: Locale) -> Value {
        let mut error = json!({
            "code": self.code,
            "message": self.message(locale),
        });
        if !self.fields.is_empty() {
            let fields: Vec<Value> = self
                .fields
                .iter()
                .map(|field| {
                    let mut value = serde_json::to_value(field).unwrap_or(Value::Null);
                    if let Value::Object(map) = &mut value {
                        map.insert(
                            "message".to_string(),
                            Value::String(field.violation.message(locale)),
                        );
                    }
                    value
                })
                .collect();
            error["fields"] = Value::Array(fields);
        }
        json!({ "success": false, "error": error })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let payload = self.payload();
        let mut response = (status, Json(payload.render(Locale::En))).into_response();
        response.extensions_mut().insert(payload);
        response
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        Self::BadRequest(messages::INVALID_BODY)
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected query string");
        Self::BadRequest(messages::INVALID_QUERY)
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected path");
        Self::BadRequest(messages::INVALID_QUERY)
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a marketplace action.
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb
                .data
                .insert((*key).to_string(), Value::String((*value).to_string()));
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use souq_core::OrderStatus;
    use souq_core::forms::Violation;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(get_status(AppError::NotFound(Entity::Product)), StatusCode::NOT_FOUND);
        assert_eq!(get_status(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AppError::Forbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::Conflict(messages::SLUG_TAKEN)),
            StatusCode::CONFLICT
        );
        assert_eq!(get_status(AppError::Coupon(CouponRejection::Expired)), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            get_status(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Store(StoreError::InvalidCursor))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::DataCorruption("x".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let payload =
            AppError::Database(RepositoryError::DataCorruption("bad doc p1".to_string())).payload();
        let body = payload.render(Locale::En);
        assert_eq!(body["error"]["code"], "internal_error");
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[test]
    fn test_validation_fields_localized() {
        let errors = ValidationErrors::single("rating", Violation::OutOfRange { min: 1, max: 5 });
        let payload = AppError::Validation(errors).payload();

        let en = payload.render(Locale::En);
        assert_eq!(en["success"], false);
        assert_eq!(en["error"]["fields"][0]["field"], "rating");
        assert_eq!(en["error"]["fields"][0]["code"], "out_of_range");
        assert_eq!(en["error"]["fields"][0]["message"], "must be between 1 and 5");

        let ar = payload.render(Locale::Ar);
        assert_eq!(ar["error"]["fields"][0]["message"], "يجب أن تكون القيمة بين 1 و 5");
    }

    #[test]
    fn test_coupon_and_transition_messages() {
        let payload = AppError::Coupon(CouponRejection::Expired).payload();
        assert_eq!(payload.code(), "coupon_expired");
        assert_eq!(payload.message(Locale::Ar), "انتهت صلاحية الكوبون");

        let payload = AppError::Transition(TransitionError {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        })
        .payload();
        assert_eq!(
            payload.message(Locale::En),
            "cannot move order from delivered to pending"
        );
    }

    #[test]
    fn test_response_carries_payload_extension() {
        let response = AppError::NotFound(Entity::Store).into_response();
        let payload = response.extensions().get::<ErrorPayload>().unwrap();
        assert_eq!(payload.message(Locale::Ar), "المتجر غير موجود");
    }
}
