//! Document store contract
//!
//! Key-value documents grouped into collections, queryable by equality
//! predicates with optional ordering and limit. Reads are wrapped in
//! synchronizer bindings; writes go straight through and are followed by
//! cache invalidation.

mod memory;

pub use memory::InMemoryDocumentStore;

use async_trait::async_trait;
use lamad_sync::LamadError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Document store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for LamadError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => LamadError::NotFound(err.to_string()),
            StoreError::InvalidDocument(_) | StoreError::Serialization(_) => {
                LamadError::Validation(err.to_string())
            }
            StoreError::Unavailable(_) => LamadError::Unknown(err.to_string()),
        }
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    /// Deserialize the fields, with the document id filled in as `id` when
    /// the fields do not carry one.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut fields = self.fields.clone();
        fields
            .entry("id")
            .or_insert_with(|| Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Convert a serializable value into a field map.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidDocument(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Equality predicate on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: SortDirection,
}

/// Query against one collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        self.predicates
            .iter()
            .all(|p| fields.get(&p.field) == Some(&p.value))
    }
}

/// Remote document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Create or replace a document.
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Merge top-level fields into an existing document.
    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Create a document with a store-assigned id.
    async fn add_document(&self, collection: &str, fields: Map<String, Value>) -> Result<String, StoreError>;

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}
