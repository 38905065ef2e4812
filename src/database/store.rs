use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::collections::CollectionSpec;
use super::manager::DatabaseError;
use crate::filter::Filter;

/// A stored document: free-form JSON body plus the system columns
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub body: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(body: Map<String, Value>) -> Self {
        let now = now();
        Self {
            id: Uuid::new_v4(),
            body,
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    /// Resolve a dotted path, including the system fields
    pub fn field(&self, path: &str) -> Option<Value> {
        match path {
            "_id" => Some(Value::String(self.id.to_string())),
            "createdAt" => Some(Value::String(format_timestamp(&self.created_at))),
            "updatedAt" => Some(Value::String(format_timestamp(&self.updated_at))),
            _ => {
                let mut segments = path.split('.');
                let mut current = self.body.get(segments.next()?)?;
                for segment in segments {
                    current = current.as_object()?.get(segment)?;
                }
                Some(current.clone())
            }
        }
    }

    /// Flattened JSON view: body fields with `_id` and the timestamps alongside
    pub fn to_value(&self) -> Value {
        let mut out = self.body.clone();
        out.insert("_id".to_string(), Value::String(self.id.to_string()));
        out.insert("createdAt".to_string(), Value::String(format_timestamp(&self.created_at)));
        out.insert("updatedAt".to_string(), Value::String(format_timestamp(&self.updated_at)));
        out.insert("isDeleted".to_string(), Value::Bool(self.is_deleted));
        out.insert(
            "deletedAt".to_string(),
            self.deleted_at.as_ref().map_or(Value::Null, |d| Value::String(format_timestamp(d))),
        );
        Value::Object(out)
    }
}

/// Current time at millisecond precision, the resolution every backend keeps
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Fixed-width UTC form so string comparison orders timestamps correctly
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Storage seam shared by the PostgreSQL and in-memory backends.
///
/// Reads skip soft-deleted documents unless the filter or call says otherwise.
/// Writes that collide with a collection's unique keys fail with
/// [`DatabaseError::Conflict`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), DatabaseError>;

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, DatabaseError>;

    async fn count(&self, filter: &Filter) -> Result<i64, DatabaseError>;

    async fn find_by_id(&self, collection: &str, id: Uuid, include_deleted: bool) -> Result<Option<Document>, DatabaseError>;

    async fn insert(&self, collection: &str, body: Map<String, Value>) -> Result<Document, DatabaseError>;

    /// Merge `patch` into the top level of a live document's body
    async fn update(&self, collection: &str, id: Uuid, patch: Map<String, Value>) -> Result<Option<Document>, DatabaseError>;

    /// Flag a live document deleted, merging `stamp` into its body; false when it was not live
    async fn soft_delete(&self, collection: &str, id: Uuid, stamp: Map<String, Value>) -> Result<bool, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;

    async fn insert_many(&self, collection: &str, bodies: Vec<Map<String, Value>>) -> Result<Vec<Document>, DatabaseError> {
        let mut out = Vec::with_capacity(bodies.len());
        for body in bodies {
            out.push(self.insert(collection, body).await?);
        }
        Ok(out)
    }
}
