//! In-memory document store.
//!
//! Keeps insertion order per collection. Used by tests and by
//! `STORE_BACKEND=memory` local runs; nothing is persisted.

use std::collections::HashMap;

use async_trait::async_trait;
use jobboard_models::UpdateResult;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{FirestoreError, FirestoreResult};
use crate::store::{DocumentStore, FieldFilter, StoredDocument};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: Option<&FieldFilter>,
    ) -> FirestoreResult<Vec<StoredDocument>> {
        let collections = self.collections.read().await;
        let docs = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.map_or(true, |f| f.matches(&d.fields)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> FirestoreResult<Option<StoredDocument>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn insert(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> FirestoreResult<()> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        if docs.iter().any(|d| d.id == id) {
            return Err(FirestoreError::AlreadyExists(format!("{}/{}", collection, id)));
        }

        docs.push(StoredDocument {
            id: id.to_string(),
            fields,
        });
        debug!(collection = %collection, id = %id, "Inserted document");
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> FirestoreResult<UpdateResult> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", collection, id)))?;

        let mut modified = false;
        for (key, value) in fields {
            if doc.fields.get(&key) != Some(&value) {
                doc.fields.insert(key, value);
                modified = true;
            }
        }
        Ok(UpdateResult::matched(modified))
    }

    async fn count(&self, collection: &str, filter: Option<&FieldFilter>) -> FirestoreResult<u64> {
        let collections = self.collections.read().await;
        let count = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| filter.map_or(true, |f| f.matches(&d.fields)))
                    .count()
            })
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn ping(&self) -> FirestoreResult<()> {
        Ok(())
    }
}
