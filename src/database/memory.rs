use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::collections::CollectionSpec;
use super::manager::DatabaseError;
use super::store::{now, Document, DocumentStore};
use crate::filter::Filter;

#[derive(Default)]
struct Collection {
    unique: Vec<Vec<String>>,
    docs: Vec<Document>,
}

impl Collection {
    /// Text form of a unique key, mirroring `body ->> 'field'`; `None` when any part is absent
    fn key_of(body: &Map<String, Value>, keys: &[String]) -> Option<Vec<String>> {
        keys.iter()
            .map(|k| match body.get(k) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            })
            .collect()
    }

    fn check_unique(&self, body: &Map<String, Value>, skip: Option<Uuid>) -> Result<(), DatabaseError> {
        for keys in &self.unique {
            let Some(candidate) = Self::key_of(body, keys) else {
                continue;
            };
            let clash = self
                .docs
                .iter()
                .filter(|d| !d.is_deleted && Some(d.id) != skip)
                .any(|d| Self::key_of(&d.body, keys).as_ref() == Some(&candidate));
            if clash {
                return Err(DatabaseError::Conflict(keys.join("_")));
            }
        }
        Ok(())
    }
}

/// Process-local store used by the test-suite and the `memory` backend
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), DatabaseError> {
        let mut collections = self.collections.write().await;
        let collection = collections.entry(spec.name.to_string()).or_default();
        collection.unique = spec.unique.iter().map(|keys| keys.iter().map(|k| k.to_string()).collect()).collect();
        Ok(())
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        let Some(collection) = collections.get(filter.table_name()) else {
            return Ok(vec![]);
        };
        let mut matched: Vec<Document> = collection.docs.iter().filter(|d| filter.matches(d)).cloned().collect();
        matched.sort_by(|a, b| filter.compare(a, b));
        Ok(filter.window(matched))
    }

    async fn count(&self, filter: &Filter) -> Result<i64, DatabaseError> {
        let collections = self.collections.read().await;
        let count = collections
            .get(filter.table_name())
            .map_or(0, |c| c.docs.iter().filter(|d| filter.matches(d)).count());
        Ok(count as i64)
    }

    async fn find_by_id(&self, collection: &str, id: Uuid, include_deleted: bool) -> Result<Option<Document>, DatabaseError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.docs.iter().find(|d| d.id == id && (include_deleted || !d.is_deleted)))
            .cloned())
    }

    async fn insert(&self, collection: &str, body: Map<String, Value>) -> Result<Document, DatabaseError> {
        Filter::new(collection)?;
        let mut collections = self.collections.write().await;
        let collection = collections.entry(collection.to_string()).or_default();
        collection.check_unique(&body, None)?;
        let doc = Document::new(body);
        collection.docs.push(doc.clone());
        Ok(doc)
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Map<String, Value>) -> Result<Option<Document>, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(collection) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(index) = collection.docs.iter().position(|d| d.id == id && !d.is_deleted) else {
            return Ok(None);
        };

        let mut merged = collection.docs[index].body.clone();
        merged.extend(patch);
        collection.check_unique(&merged, Some(id))?;

        let doc = &mut collection.docs[index];
        doc.body = merged;
        doc.updated_at = now();
        Ok(Some(doc.clone()))
    }

    async fn soft_delete(&self, collection: &str, id: Uuid, stamp: Map<String, Value>) -> Result<bool, DatabaseError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|c| c.docs.iter_mut().find(|d| d.id == id && !d.is_deleted))
        else {
            return Ok(false);
        };
        let ts = now();
        doc.body.extend(stamp);
        doc.is_deleted = true;
        doc.deleted_at = Some(ts);
        doc.updated_at = ts;
        Ok(true)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::collections::USERS;
    use crate::filter::FilterData;
    use serde_json::json;

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    async fn store() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        store.ensure_collection(&USERS).await.unwrap();
        store
    }

    #[tokio::test]
    async fn unique_keys_ignore_deleted_documents() {
        let store = store().await;
        let first = store.insert("users", body(json!({ "email": "a@x.io" }))).await.unwrap();
        assert!(matches!(
            store.insert("users", body(json!({ "email": "a@x.io" }))).await,
            Err(DatabaseError::Conflict(_))
        ));

        assert!(store.soft_delete("users", first.id, Map::new()).await.unwrap());
        store.insert("users", body(json!({ "email": "a@x.io" }))).await.unwrap();
    }

    #[tokio::test]
    async fn soft_delete_is_idempotent_and_hides_document() {
        let store = store().await;
        let doc = store.insert("users", body(json!({ "email": "b@x.io" }))).await.unwrap();
        assert!(store.soft_delete("users", doc.id, body(json!({ "deletedBy": "t" }))).await.unwrap());
        assert!(!store.soft_delete("users", doc.id, Map::new()).await.unwrap());

        assert!(store.find_by_id("users", doc.id, false).await.unwrap().is_none());
        let deleted = store.find_by_id("users", doc.id, true).await.unwrap().unwrap();
        assert!(deleted.is_deleted);
        assert_eq!(deleted.body["deletedBy"], "t");

        let filter = Filter::new("users").unwrap();
        assert_eq!(store.count(&filter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_merges_and_rechecks_uniqueness() {
        let store = store().await;
        let a = store.insert("users", body(json!({ "email": "a@x.io", "age": 20 }))).await.unwrap();
        store.insert("users", body(json!({ "email": "c@x.io" }))).await.unwrap();

        let updated = store.update("users", a.id, body(json!({ "age": 21 }))).await.unwrap().unwrap();
        assert_eq!(updated.body["email"], "a@x.io");
        assert_eq!(updated.body["age"], 21);

        assert!(matches!(
            store.update("users", a.id, body(json!({ "email": "c@x.io" }))).await,
            Err(DatabaseError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn find_applies_filter_order_and_window() {
        let store = store().await;
        for (email, age) in [("a@x.io", 30), ("b@x.io", 20), ("c@x.io", 25)] {
            store.insert("users", body(json!({ "email": email, "age": age }))).await.unwrap();
        }
        let mut filter = Filter::new("users").unwrap();
        filter
            .assign(FilterData {
                where_clause: Some(json!({ "age": { "$gte": 21 } })),
                order: Some(json!("-age")),
                limit: Some(1),
                offset: None,
            })
            .unwrap();
        let found = store.find(&filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].body["email"], "a@x.io");
        assert_eq!(store.count(&filter).await.unwrap(), 2);
    }
}
