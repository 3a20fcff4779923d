//! `PostgreSQL` document store.
//!
//! Every collection lives in the single `documents` table:
//!
//! ```sql
//! documents(collection text, id text, data jsonb, created_at, updated_at)
//! ```
//!
//! Filters compile to `jsonb` operators on `data -> field`, so comparison
//! follows `jsonb` ordering. Field names are bound as parameters, never
//! spliced into SQL. Keyset pagination compares `(data -> field, id)` with
//! the id in `"C"` collation to match the byte order of the memory backend.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use super::document::{Direction, Document, Filter, FilterOp, Page, Patch, Query, check_field};
use super::{DocumentStore, StoreError};

/// A [`DocumentStore`] backed by `PostgreSQL` JSONB.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Wrap a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique-index violation (`23505`) to `StoreError::Conflict`.
fn conflict_or(err: sqlx::Error, collection: &str, id: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => StoreError::Conflict {
            collection: collection.to_string(),
            id: id.to_string(),
        },
        _ => err.into(),
    }
}

fn decode_row(row: &sqlx::postgres::PgRow) -> Result<Document, StoreError> {
    let Json(value): Json<Value> = row.try_get("data")?;
    Document::from_value(value)
}

/// Append `AND <filter>` for each filter.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) {
    for filter in filters {
        builder.push(" AND ");
        let value = Json(filter.value.clone());
        match filter.op {
            FilterOp::Eq | FilterOp::Ne | FilterOp::Lt | FilterOp::Lte | FilterOp::Gt | FilterOp::Gte => {
                let op = match filter.op {
                    FilterOp::Eq => " = ",
                    FilterOp::Ne => " <> ",
                    FilterOp::Lt => " < ",
                    FilterOp::Lte => " <= ",
                    FilterOp::Gt => " > ",
                    _ => " >= ",
                };
                builder
                    .push("(data -> ")
                    .push_bind(filter.field.clone())
                    .push(")")
                    .push(op)
                    .push_bind(value);
            }
            FilterOp::ArrayContains => {
                builder
                    .push("jsonb_typeof(data -> ")
                    .push_bind(filter.field.clone())
                    .push(") = 'array' AND (data -> ")
                    .push_bind(filter.field.clone())
                    .push(") @> jsonb_build_array(")
                    .push_bind(value)
                    .push("::jsonb)");
            }
            FilterOp::In => {
                builder
                    .push("EXISTS (SELECT 1 FROM jsonb_array_elements(")
                    .push_bind(value)
                    .push("::jsonb) AS opt(v) WHERE opt.v = (data -> ")
                    .push_bind(filter.field.clone())
                    .push("))");
            }
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query("SELECT data FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<Document, StoreError> {
        let id = document.id().to_string();
        let row = sqlx::query(
            r"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO NOTHING
            RETURNING data
            ",
        )
        .bind(collection)
        .bind(&id)
        .bind(Json(document.into_value()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or(e, collection, &id))?;

        match row {
            Some(row) => decode_row(&row),
            None => Err(StoreError::Conflict {
                collection: collection.to_string(),
                id,
            }),
        }
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Patch,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(
            r"
            UPDATE documents
            SET data = data || $3 || jsonb_build_object('id', id),
                updated_at = now()
            WHERE collection = $1 AND id = $2
            RETURNING data
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(patch)))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or(e, collection, id))?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Page, StoreError> {
        query.validate()?;

        let mut builder = QueryBuilder::<Postgres>::new("SELECT data FROM documents WHERE collection = ");
        builder.push_bind(collection.to_string());
        push_filters(&mut builder, &query.filters);

        let (cmp, dir) = match query.direction() {
            Direction::Asc => (" > ", " ASC"),
            Direction::Desc => (" < ", " DESC"),
        };

        match &query.order_by {
            Some(order_by) => {
                builder
                    .push(" AND data ? ")
                    .push_bind(order_by.field.clone());

                if let Some(cursor) = &query.cursor {
                    builder
                        .push(" AND ((data -> ")
                        .push_bind(order_by.field.clone())
                        .push(")")
                        .push(cmp)
                        .push_bind(Json(cursor.value.clone()))
                        .push(" OR ((data -> ")
                        .push_bind(order_by.field.clone())
                        .push(") = ")
                        .push_bind(Json(cursor.value.clone()))
                        .push(" AND id COLLATE \"C\"")
                        .push(cmp)
                        .push_bind(cursor.id.clone())
                        .push("))");
                }

                builder
                    .push(" ORDER BY (data -> ")
                    .push_bind(order_by.field.clone())
                    .push(")")
                    .push(dir)
                    .push(", id COLLATE \"C\"")
                    .push(dir);
            }
            None => {
                if let Some(cursor) = &query.cursor {
                    builder
                        .push(" AND id COLLATE \"C\"")
                        .push(cmp)
                        .push_bind(cursor.id.clone());
                }
                builder.push(" ORDER BY id COLLATE \"C\"").push(dir);
            }
        }

        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(query.limit + 1).unwrap_or(i64::MAX));

        let rows = builder.build().fetch_all(&self.pool).await?;
        let documents = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page::from_overfetch(documents, query))
    }

    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<u64, StoreError> {
        for filter in filters {
            check_field(&filter.field)?;
        }
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS n FROM documents WHERE collection = ");
        builder.push_bind(collection.to_string());
        push_filters(&mut builder, filters);

        let row = builder.build().fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(u64::try_from(n).unwrap_or_default())
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Option<Document>, StoreError> {
        check_field(field)?;
        let result = sqlx::query(
            r"
            UPDATE documents
            SET data = jsonb_set(
                    data,
                    ARRAY[$3::text],
                    to_jsonb(COALESCE((data ->> $3::text)::numeric, 0) + $4::bigint)
                ),
                updated_at = now()
            WHERE collection = $1 AND id = $2
            RETURNING data
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(field)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(row) => row.as_ref().map(decode_row).transpose(),
            // invalid_text_representation: the field holds a non-numeric string
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some("22P02") => {
                Err(StoreError::NotNumeric(field.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn push(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<Option<Document>, StoreError> {
        check_field(field)?;
        let row = sqlx::query(
            r"
            UPDATE documents
            SET data = jsonb_set(
                    data,
                    ARRAY[$3::text],
                    COALESCE(data -> $3::text, '[]'::jsonb) || jsonb_build_array($4::jsonb)
                ),
                updated_at = now()
            WHERE collection = $1 AND id = $2
            RETURNING data
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(field)
        .bind(Json(value))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(decode_row).transpose()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
