//! Documents, queries and cursors shared by every store backend.
//!
//! A document is a flat JSON object whose `id` field is its key within a
//! collection. Queries combine field filters, an optional ordering and
//! keyset pagination. Both backends compare values with the same total
//! order ([`compare_values`]) so a cursor produced by one page continues
//! exactly where the page ended.

use std::cmp::Ordering;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::StoreError;

/// Largest page a query may request.
pub const MAX_LIMIT: usize = 100;
/// Page size when a query does not set one.
pub const DEFAULT_LIMIT: usize = 20;

/// Collection names.
pub mod collections {
    pub const USERS: &str = "users";
    pub const STORES: &str = "stores";
    pub const PRODUCTS: &str = "products";
    pub const ORDERS: &str = "orders";
    pub const COUPONS: &str = "coupons";
    pub const REVIEWS: &str = "reviews";
    pub const WISHLIST: &str = "wishlist";
    pub const SESSIONS: &str = "sessions";
}

/// A JSON object stored under its `id` field.
#[derive(Debug, Clone, PartialEq)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Wrap a JSON value, which must be an object with a string `id`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidDocument` otherwise.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(map) if map.get("id").is_some_and(Value::is_string) => Ok(Self(map)),
            Value::Object(_) => Err(StoreError::InvalidDocument(
                "document has no string id".to_string(),
            )),
            _ => Err(StoreError::InvalidDocument(
                "document is not a JSON object".to_string(),
            )),
        }
    }

    /// Serialize an entity into a document.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidDocument` if the entity does not
    /// serialize to an object with a string `id`.
    pub fn from_entity<T: Serialize>(entity: &T) -> Result<Self, StoreError> {
        let value = serde_json::to_value(entity)
            .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;
        Self::from_value(value)
    }

    /// Decode into an entity.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the document does not match `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0))
    }

    /// The document key.
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.get("id").and_then(Value::as_str).unwrap_or_default()
    }

    /// A top-level field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The underlying object.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Mutable access for backends applying patches.
    pub(crate) fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.0
    }

    /// Convert back into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Top-level fields to merge into a document.
pub type Patch = Map<String, Value>;

/// Serialize a changes struct into a patch.
///
/// # Errors
///
/// Returns `StoreError::InvalidDocument` if `changes` is not an object.
pub fn patch_from<T: Serialize>(changes: &T) -> Result<Patch, StoreError> {
    match serde_json::to_value(changes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::InvalidDocument(
            "patch is not a JSON object".to_string(),
        )),
        Err(e) => Err(StoreError::InvalidDocument(e.to_string())),
    }
}

/// Filter comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// The field is an array containing the value.
    ArrayContains,
    /// The value is an array containing the field.
    In,
}

/// A condition on one top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// Whether `document` satisfies this filter. A missing field never does.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        let Some(field) = document.get(&self.field) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => compare_values(field, &self.value) == Ordering::Equal,
            FilterOp::Ne => compare_values(field, &self.value) != Ordering::Equal,
            FilterOp::Lt => compare_values(field, &self.value) == Ordering::Less,
            FilterOp::Lte => compare_values(field, &self.value) != Ordering::Greater,
            FilterOp::Gt => compare_values(field, &self.value) == Ordering::Greater,
            FilterOp::Gte => compare_values(field, &self.value) != Ordering::Less,
            FilterOp::ArrayContains => field.as_array().is_some_and(|items| {
                items
                    .iter()
                    .any(|item| compare_values(item, &self.value) == Ordering::Equal)
            }),
            FilterOp::In => self.value.as_array().is_some_and(|options| {
                options
                    .iter()
                    .any(|option| compare_values(field, option) == Ordering::Equal)
            }),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("invalid direction: {other}")),
        }
    }
}

/// Ordering on one top-level field; ties break on `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Position after the last document of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    /// Value of the order field (`null` for id-ordered queries).
    pub value: Value,
    pub id: String,
}

impl Cursor {
    /// Opaque, URL-safe form: base64 of `[value, id]`.
    #[must_use]
    pub fn encode(&self) -> String {
        let pair = Value::Array(vec![self.value.clone(), Value::String(self.id.clone())]);
        URL_SAFE_NO_PAD.encode(pair.to_string())
    }

    /// Parse a cursor produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidCursor` for anything else.
    pub fn decode(encoded: &str) -> Result<Self, StoreError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|_| StoreError::InvalidCursor)?;
        let pair: Value = serde_json::from_slice(&bytes).map_err(|_| StoreError::InvalidCursor)?;
        match pair {
            Value::Array(mut items) if items.len() == 2 => {
                let id = items.pop();
                let value = items.pop();
                match (value, id) {
                    (Some(value), Some(Value::String(id))) => Ok(Self { value, id }),
                    _ => Err(StoreError::InvalidCursor),
                }
            }
            _ => Err(StoreError::InvalidCursor),
        }
    }

    /// Cursor positioned after `document` for `order_by`.
    #[must_use]
    pub fn after(document: &Document, order_by: Option<&OrderBy>) -> Self {
        let value = order_by
            .and_then(|o| document.get(&o.field))
            .cloned()
            .unwrap_or(Value::Null);
        Self {
            value,
            id: document.id().to_string(),
        }
    }
}

/// A filtered, ordered, paginated read of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: usize,
    pub cursor: Option<Cursor>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            order_by: None,
            limit: DEFAULT_LIMIT,
            cursor: None,
        }
    }
}

impl Query {
    /// Unfiltered query ordered by id.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    /// Shorthand for an equality filter.
    #[must_use]
    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    /// Order by a field. Documents without the field are excluded.
    #[must_use]
    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    /// Page size, clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit.clamp(1, MAX_LIMIT);
        self
    }

    /// Continue after a previous page.
    #[must_use]
    pub fn after(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Check every field name the query touches.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidField` or `StoreError::InvalidQuery`.
    pub fn validate(&self) -> Result<(), StoreError> {
        for filter in &self.filters {
            check_field(&filter.field)?;
            if filter.op == FilterOp::In && !filter.value.is_array() {
                return Err(StoreError::InvalidQuery(format!(
                    "`in` filter on {} needs an array",
                    filter.field
                )));
            }
        }
        if let Some(order_by) = &self.order_by {
            check_field(&order_by.field)?;
        }
        Ok(())
    }

    /// Whether `document` passes every filter and has the order field.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(document))
            && self
                .order_by
                .as_ref()
                .is_none_or(|o| document.get(&o.field).is_some())
    }

    /// Compare two documents in result order.
    #[must_use]
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ordering = match &self.order_by {
            Some(order_by) => {
                let null = Value::Null;
                let av = a.get(&order_by.field).unwrap_or(&null);
                let bv = b.get(&order_by.field).unwrap_or(&null);
                compare_values(av, bv).then_with(|| a.id().as_bytes().cmp(b.id().as_bytes()))
            }
            None => a.id().as_bytes().cmp(b.id().as_bytes()),
        };
        match self.direction() {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }

    /// Whether `document` sorts strictly after the query's cursor.
    #[must_use]
    pub fn is_past_cursor(&self, document: &Document) -> bool {
        let Some(cursor) = &self.cursor else {
            return true;
        };
        let ordering = match &self.order_by {
            Some(order_by) => {
                let null = Value::Null;
                let value = document.get(&order_by.field).unwrap_or(&null);
                compare_values(value, &cursor.value)
                    .then_with(|| document.id().as_bytes().cmp(cursor.id.as_bytes()))
            }
            None => document.id().as_bytes().cmp(cursor.id.as_bytes()),
        };
        match self.direction() {
            Direction::Asc => ordering == Ordering::Greater,
            Direction::Desc => ordering == Ordering::Less,
        }
    }

    /// Effective sort direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.order_by
            .as_ref()
            .map_or(Direction::Asc, |o| o.direction)
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub documents: Vec<Document>,
    /// Present only when more documents match past this page.
    pub next_cursor: Option<Cursor>,
}

impl Page {
    /// Build a page from up to `limit + 1` ordered matches.
    #[must_use]
    pub fn from_overfetch(mut documents: Vec<Document>, query: &Query) -> Self {
        let has_more = documents.len() > query.limit;
        documents.truncate(query.limit);
        let next_cursor = if has_more {
            documents
                .last()
                .map(|last| Cursor::after(last, query.order_by.as_ref()))
        } else {
            None
        };
        Self {
            documents,
            next_cursor,
        }
    }

    /// Decode every document.
    ///
    /// # Errors
    ///
    /// Returns the first serde error.
    pub fn decode<T: DeserializeOwned>(self) -> Result<(Vec<T>, Option<Cursor>), serde_json::Error> {
        let items = self
            .documents
            .into_iter()
            .map(Document::decode)
            .collect::<Result<Vec<T>, _>>()?;
        Ok((items, self.next_cursor))
    }
}

/// Field names are plain top-level identifiers.
///
/// # Errors
///
/// Returns `StoreError::InvalidField` otherwise.
pub fn check_field(field: &str) -> Result<(), StoreError> {
    let valid = !field.is_empty()
        && field.len() <= 64
        && field
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidField(field.to_string()))
    }
}

/// Rank of a JSON type in the cross-type order.
const fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over JSON values, matching `PostgreSQL` `jsonb` comparison.
///
/// `null < string < number < boolean < array < object`. Numbers compare
/// numerically and strings by bytes. Arrays and objects compare by length
/// first, then element-wise (objects by sorted key, then value).
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x.len().cmp(&y.len()).then_with(|| {
            x.iter()
                .zip(y)
                .map(|(l, r)| compare_values(l, r))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }),
        (Value::Object(x), Value::Object(y)) => x.len().cmp(&y.len()).then_with(|| {
            let mut xs: Vec<_> = x.iter().collect();
            let mut ys: Vec<_> = y.iter().collect();
            xs.sort_by(|l, r| l.0.cmp(r.0));
            ys.sort_by(|l, r| l.0.cmp(r.0));
            xs.iter()
                .zip(&ys)
                .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| compare_values(lv, rv)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        }),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn compare_numbers(x: &serde_json::Number, y: &serde_json::Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    let a = x.as_f64().unwrap_or(f64::NAN);
    let b = y.as_f64().unwrap_or(f64::NAN);
    a.total_cmp(&b)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_document_requires_string_id() {
        assert!(Document::from_value(json!({"id": "a"})).is_ok());
        assert!(Document::from_value(json!({"id": 1})).is_err());
        assert!(Document::from_value(json!(["a"])).is_err());
    }

    #[test]
    fn test_cross_type_order() {
        let ordered = [
            json!(null),
            json!("zzz"),
            json!(-5),
            json!(1.5),
            json!(2),
            json!(false),
            json!(true),
            json!([9]),
            json!({"a": 1}),
        ];
        for pair in ordered.windows(2) {
            if let [a, b] = pair {
                assert_eq!(compare_values(a, b), Ordering::Less, "{a} < {b}");
            }
        }
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert_eq!(compare_values(&json!(10), &json!(9.5)), Ordering::Greater);
        assert_eq!(compare_values(&json!(2), &json!(2.0)), Ordering::Equal);
    }

    #[test]
    fn test_strings_compare_by_bytes() {
        assert_eq!(compare_values(&json!("B"), &json!("a")), Ordering::Less);
        assert_eq!(
            compare_values(&json!("2026-01-02T00:00:00.000000Z"), &json!("2026-01-10T00:00:00.000000Z")),
            Ordering::Less
        );
    }

    #[test]
    fn test_filters() {
        let d = doc(json!({"id": "p1", "price": 50, "status": "active", "tags": ["a", "b"]}));
        let f = |field: &str, op, value| Filter {
            field: field.to_string(),
            op,
            value,
        };

        assert!(f("status", FilterOp::Eq, json!("active")).matches(&d));
        assert!(f("status", FilterOp::Ne, json!("draft")).matches(&d));
        assert!(f("price", FilterOp::Gte, json!(50)).matches(&d));
        assert!(!f("price", FilterOp::Gt, json!(50)).matches(&d));
        assert!(f("price", FilterOp::Lt, json!(50.01)).matches(&d));
        assert!(f("tags", FilterOp::ArrayContains, json!("b")).matches(&d));
        assert!(!f("tags", FilterOp::ArrayContains, json!("c")).matches(&d));
        assert!(f("status", FilterOp::In, json!(["draft", "active"])).matches(&d));
        // Missing fields match nothing, not even `ne`.
        assert!(!f("category", FilterOp::Ne, json!("x")).matches(&d));
    }

    #[test]
    fn test_cursor_roundtrip_and_garbage() {
        let cursor = Cursor {
            value: json!("2026-03-01T10:00:00.000000Z"),
            id: "abc".to_string(),
        };
        let encoded = cursor.encode();
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        assert_eq!(Cursor::decode(&encoded).unwrap(), cursor);

        assert!(matches!(Cursor::decode("!!!"), Err(StoreError::InvalidCursor)));
        let not_pair = URL_SAFE_NO_PAD.encode("[1,2,3]");
        assert!(matches!(Cursor::decode(&not_pair), Err(StoreError::InvalidCursor)));
    }

    #[test]
    fn test_query_validation() {
        assert!(Query::new().eq("storeId", "s1").validate().is_ok());
        assert!(Query::new().eq("data->>'x'", "s1").validate().is_err());
        assert!(
            Query::new()
                .filter("status", FilterOp::In, "active")
                .validate()
                .is_err()
        );
        assert_eq!(Query::new().limit(0).limit, 1);
        assert_eq!(Query::new().limit(500).limit, MAX_LIMIT);
    }

    #[test]
    fn test_order_excludes_missing_field() {
        let query = Query::new().order_by("price", Direction::Desc);
        assert!(query.matches(&doc(json!({"id": "a", "price": null}))));
        assert!(!query.matches(&doc(json!({"id": "b"}))));
    }

    #[test]
    fn test_page_from_overfetch() {
        let query = Query::new().order_by("n", Direction::Asc).limit(2);
        let docs = vec![
            doc(json!({"id": "a", "n": 1})),
            doc(json!({"id": "b", "n": 2})),
            doc(json!({"id": "c", "n": 3})),
        ];
        let page = Page::from_overfetch(docs, &query);
        assert_eq!(page.documents.len(), 2);
        assert_eq!(
            page.next_cursor,
            Some(Cursor {
                value: json!(2),
                id: "b".to_string()
            })
        );
    }
}
