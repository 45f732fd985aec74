//! The document store capability the services are written against.

use async_trait::async_trait;
use jobboard_models::UpdateResult;
use serde_json::{Map, Value};

use crate::error::FirestoreResult;

/// Equality filter on a string field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether a document's fields satisfy the filter.
    ///
    /// Only string fields can match; a stored number never equals a string
    /// filter value.
    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        matches!(fields.get(&self.field), Some(Value::String(s)) if *s == self.value)
    }
}

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// Persistence for schemaless documents grouped in collections.
///
/// Every call is atomic for a single document only.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents of a collection, optionally filtered. Order is store-defined.
    async fn find(
        &self,
        collection: &str,
        filter: Option<&FieldFilter>,
    ) -> FirestoreResult<Vec<StoredDocument>>;

    /// A single document by ID.
    async fn get(&self, collection: &str, id: &str) -> FirestoreResult<Option<StoredDocument>>;

    /// Insert a new document under the given ID.
    async fn insert(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> FirestoreResult<()>;

    /// Overwrite the given fields of an existing document, leaving the rest
    /// untouched. Fails with `NotFound` instead of creating the document.
    async fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> FirestoreResult<UpdateResult>;

    /// Number of documents matching the filter.
    async fn count(&self, collection: &str, filter: Option<&FieldFilter>) -> FirestoreResult<u64>;

    /// Cheap round trip used by readiness probes.
    async fn ping(&self) -> FirestoreResult<()>;
}
