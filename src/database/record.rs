use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::manager::DatabaseError;
use super::store::Document;

/// A typed document: the system fields plus the collection's own data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub data: T,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default, with = "timestamp::option")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl<T: DeserializeOwned> Record<T> {
    pub fn from_document(doc: Document) -> Result<Self, DatabaseError> {
        Ok(Self {
            id: doc.id,
            data: serde_json::from_value(Value::Object(doc.body))?,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
            is_deleted: doc.is_deleted,
            deleted_at: doc.deleted_at,
        })
    }
}

impl<T> Record<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Record<U> {
        Record {
            id: self.id,
            data: f(self.data),
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_deleted: self.is_deleted,
            deleted_at: self.deleted_at,
        }
    }
}

/// `{ _id, createdAt }` acknowledgement returned by create operations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Created {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl<T> From<&Record<T>> for Created {
    fn from(record: &Record<T>) -> Self {
        Self {
            id: record.id,
            created_at: record.created_at,
        }
    }
}

/// Serializes a value into a document body
pub fn to_body<T: Serialize>(value: &T) -> Result<Map<String, Value>, DatabaseError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(DatabaseError::QueryError(format!("document body must be an object, got {}", other))),
    }
}

/// Fixed-width RFC 3339 timestamps (`2024-01-01T00:00:00.000Z`) so stored dates compare as strings
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::database::store::format_timestamp;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<DateTime<Utc>>::deserialize(deserializer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Company {
        name: String,
    }

    #[test]
    fn record_flattens_data_with_system_fields() {
        let doc = Document::new(json!({ "name": "Acme" }).as_object().cloned().unwrap());
        let record: Record<Company> = Record::from_document(doc.clone()).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["_id"], json!(doc.id));
        assert_eq!(value["name"], "Acme");
        assert_eq!(value["isDeleted"], false);
        assert!(value["createdAt"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn to_body_rejects_non_objects() {
        assert!(to_body(&json!([1, 2])).is_err());
        assert_eq!(to_body(&Company { name: "x".into() }).unwrap()["name"], "x");
    }
}
