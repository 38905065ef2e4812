use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use super::collections::CollectionSpec;
use super::manager::DatabaseError;
use super::record::{to_body, Record};
use super::store::DocumentStore;
use crate::filter::{Filter, FilterData};

/// Typed access to one collection of the document store
pub struct Repository<T> {
    spec: CollectionSpec,
    store: Arc<dyn DocumentStore>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec,
            store: self.store.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T> Repository<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(spec: CollectionSpec, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            spec,
            store,
            _phantom: PhantomData,
        }
    }

    fn filter(&self, filter_data: FilterData) -> Result<Filter, DatabaseError> {
        let mut filter = Filter::new(self.spec.name)?;
        filter.assign(filter_data)?;
        Ok(filter)
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<Record<T>>, DatabaseError> {
        let filter = self.filter(filter_data)?;
        self.store
            .find(&filter)
            .await?
            .into_iter()
            .map(Record::from_document)
            .collect()
    }

    pub async fn select_one(&self, mut filter_data: FilterData) -> Result<Option<Record<T>>, DatabaseError> {
        filter_data.limit = Some(1);
        Ok(self.select_any(filter_data).await?.into_iter().next())
    }

    pub async fn count(&self, filter_data: FilterData) -> Result<i64, DatabaseError> {
        let filter = self.filter(filter_data)?;
        self.store.count(&filter).await
    }

    pub async fn exists(&self, where_clause: Value) -> Result<bool, DatabaseError> {
        Ok(self.count(FilterData::where_(where_clause)).await? > 0)
    }

    pub async fn select_ids(&self, ids: &[Uuid]) -> Result<Vec<Record<T>>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        self.select_any(FilterData::where_(json!({ "_id": { "$in": ids } }))).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Record<T>>, DatabaseError> {
        self.store
            .find_by_id(self.spec.name, id, false)
            .await?
            .map(Record::from_document)
            .transpose()
    }

    /// Looks past the soft-delete flag; used to tell "already deleted" from "never existed"
    pub async fn find_by_id_with_deleted(&self, id: Uuid) -> Result<Option<Record<T>>, DatabaseError> {
        self.store
            .find_by_id(self.spec.name, id, true)
            .await?
            .map(Record::from_document)
            .transpose()
    }

    pub async fn insert(&self, data: &T) -> Result<Record<T>, DatabaseError> {
        let doc = self.store.insert(self.spec.name, to_body(data)?).await?;
        Record::from_document(doc)
    }

    pub async fn insert_many(&self, items: &[T]) -> Result<Vec<Record<T>>, DatabaseError> {
        let bodies = items.iter().map(to_body).collect::<Result<Vec<_>, _>>()?;
        self.store
            .insert_many(self.spec.name, bodies)
            .await?
            .into_iter()
            .map(Record::from_document)
            .collect()
    }

    pub async fn update(&self, id: Uuid, patch: Map<String, Value>) -> Result<Option<Record<T>>, DatabaseError> {
        self.store
            .update(self.spec.name, id, patch)
            .await?
            .map(Record::from_document)
            .transpose()
    }

    pub async fn soft_delete(&self, id: Uuid, stamp: Map<String, Value>) -> Result<bool, DatabaseError> {
        self.store.soft_delete(self.spec.name, id, stamp).await
    }
}
