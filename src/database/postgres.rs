use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::{Query, QueryAs};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::collections::CollectionSpec;
use super::manager::DatabaseError;
use super::store::{now, Document, DocumentStore};
use crate::filter::{Filter, SqlParam};

const COLUMNS: &str = "\"id\", \"body\", \"created_at\", \"updated_at\", \"is_deleted\", \"deleted_at\"";

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    body: Json<Map<String, Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            body: row.body.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at,
        }
    }
}

/// One table per collection; the document body lives in a `JSONB` column
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn table(collection: &str) -> Result<String, DatabaseError> {
        // Same rules the filter applies to collection names
        Filter::new(collection)?;
        Ok(format!("\"{}\"", collection))
    }

    fn bind_params<'q>(
        mut query: QueryAs<'q, Postgres, DocumentRow, PgArguments>,
        params: &'q [SqlParam],
    ) -> QueryAs<'q, Postgres, DocumentRow, PgArguments> {
        for param in params {
            query = match param {
                SqlParam::Json(v) => query.bind(Json(v)),
                SqlParam::Text(s) => query.bind(s.as_str()),
            };
        }
        query
    }

    fn bind_count_params<'q>(mut query: Query<'q, Postgres, PgArguments>, params: &'q [SqlParam]) -> Query<'q, Postgres, PgArguments> {
        for param in params {
            query = match param {
                SqlParam::Json(v) => query.bind(Json(v)),
                SqlParam::Text(s) => query.bind(s.as_str()),
            };
        }
        query
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), DatabaseError> {
        let table = Self::table(spec.name)?;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                \"id\" UUID PRIMARY KEY,
                \"body\" JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                \"created_at\" TIMESTAMPTZ NOT NULL DEFAULT now(),
                \"updated_at\" TIMESTAMPTZ NOT NULL DEFAULT now(),
                \"is_deleted\" BOOLEAN NOT NULL DEFAULT FALSE,
                \"deleted_at\" TIMESTAMPTZ
            )"
        );
        sqlx::query(&ddl).execute(&self.pool).await?;

        for keys in spec.unique {
            let index = format!("{}_{}_key", spec.name, keys.join("_"));
            let exprs: Vec<String> = keys.iter().map(|k| format!("(\"body\" ->> '{}')", k)).collect();
            let ddl = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"{index}\" ON {table} ({}) WHERE NOT \"is_deleted\"",
                exprs.join(", ")
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
        }

        info!("Collection ready: {}", spec.name);
        Ok(())
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        let sql = filter.to_sql(COLUMNS);
        debug!("find: {}", sql.query);
        let rows = Self::bind_params(sqlx::query_as::<_, DocumentRow>(&sql.query), &sql.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn count(&self, filter: &Filter) -> Result<i64, DatabaseError> {
        let sql = filter.to_count_sql();
        let row: PgRow = Self::bind_count_params(sqlx::query(&sql.query), &sql.params)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>("count")?)
    }

    async fn find_by_id(&self, collection: &str, id: Uuid, include_deleted: bool) -> Result<Option<Document>, DatabaseError> {
        let table = Self::table(collection)?;
        let gate = if include_deleted { "" } else { " AND NOT \"is_deleted\"" };
        let query = format!("SELECT {COLUMNS} FROM {table} WHERE \"id\" = $1{gate}");
        let row = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Document::from))
    }

    async fn insert(&self, collection: &str, body: Map<String, Value>) -> Result<Document, DatabaseError> {
        let table = Self::table(collection)?;
        let query = format!(
            "INSERT INTO {table} (\"id\", \"body\", \"created_at\", \"updated_at\") VALUES ($1, $2, $3, $3) RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(Uuid::new_v4())
            .bind(Json(&body))
            .bind(now())
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(row.into())
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Map<String, Value>) -> Result<Option<Document>, DatabaseError> {
        let table = Self::table(collection)?;
        let query = format!(
            "UPDATE {table} SET \"body\" = \"body\" || $2, \"updated_at\" = $3 WHERE \"id\" = $1 AND NOT \"is_deleted\" RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, DocumentRow>(&query)
            .bind(id)
            .bind(Json(&patch))
            .bind(now())
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(row.map(Document::from))
    }

    async fn soft_delete(&self, collection: &str, id: Uuid, stamp: Map<String, Value>) -> Result<bool, DatabaseError> {
        let table = Self::table(collection)?;
        let query = format!(
            "UPDATE {table} SET \"is_deleted\" = TRUE, \"deleted_at\" = $2, \"updated_at\" = $2, \"body\" = \"body\" || $3 \
             WHERE \"id\" = $1 AND NOT \"is_deleted\""
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(now())
            .bind(Json(&stamp))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
