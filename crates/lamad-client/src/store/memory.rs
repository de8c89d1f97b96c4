//! In-memory document store

use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::trace;

use super::{Document, DocumentStore, Query, SortDirection, StoreError};

type Collection = BTreeMap<String, Map<String, Value>>;

/// Document store backed by process memory.
///
/// Useful for tests and offline demos. Can be switched to an unavailable
/// state to exercise error paths.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: DashMap<String, Collection>,
    unavailable: AtomicBool,
    reads: AtomicU64,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of read calls served (get + query).
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|c| c.len()).unwrap_or(0)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store disabled".into()));
        }
        Ok(())
    }
}

/// Ordering for JSON values of the same shape. Mixed or non-scalar values
/// compare equal so the sort stays stable.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None, Some(_)) => CmpOrdering::Less,
        (Some(_), None) => CmpOrdering::Greater,
        _ => CmpOrdering::Equal,
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
            .map(|fields| Document {
                id: id.to_string(),
                fields,
            }))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        let mut results: Vec<Document> = match self.collections.get(collection) {
            Some(docs) => docs
                .iter()
                .filter(|(_, fields)| query.matches(fields))
                .map(|(id, fields)| Document {
                    id: id.clone(),
                    fields: fields.clone(),
                })
                .collect(),
            None => Vec::new(),
        };

        if let Some(order) = &query.order_by {
            results.sort_by(|a, b| {
                let ord = compare_values(a.fields.get(&order.field), b.fields.get(&order.field));
                match order.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        trace!(collection, count = results.len(), "query served");
        Ok(results)
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    async fn update_document(
        &self,
        collection: &str,
        id: &str,
        partial: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let not_found = || StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        };

        let mut docs = self.collections.get_mut(collection).ok_or_else(not_found)?;
        let fields = docs.get_mut(id).ok_or_else(not_found)?;
        for (key, value) in partial {
            fields.insert(key, value);
        }
        Ok(())
    }

    async fn add_document(&self, collection: &str, fields: Map<String, Value>) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.set_document(collection, &id, fields).await?;
        Ok(id)
    }

    async fn delete_document(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check_available()?;
        if let Some(mut docs) = self.collections.get_mut(collection) {
            docs.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let store = InMemoryDocumentStore::new();
        let id = store
            .add_document("paths", fields(json!({"name": "Rust", "progress": 0})))
            .await
            .unwrap();

        store
            .update_document("paths", &id, fields(json!({"progress": 40})))
            .await
            .unwrap();

        let doc = store.get_document("paths", &id).await.unwrap().unwrap();
        assert_eq!(doc.fields["name"], "Rust");
        assert_eq!(doc.fields["progress"], 40);

        store.delete_document("paths", &id).await.unwrap();
        assert!(store.get_document("paths", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let store = InMemoryDocumentStore::new();
        let result = store.update_document("paths", "nope", Map::new()).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_query_filter_order_limit() {
        let store = InMemoryDocumentStore::new();
        for (id, owner, created) in [("a", "u1", 3), ("b", "u2", 1), ("c", "u1", 1), ("d", "u1", 2)] {
            store
                .set_document("paths", id, fields(json!({"ownerId": owner, "createdAt": created})))
                .await
                .unwrap();
        }

        let query = Query::new()
            .where_eq("ownerId", "u1")
            .order_by("createdAt", SortDirection::Descending)
            .limit(2);
        let ids: Vec<String> = store
            .query("paths", &query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();

        assert_eq!(ids, vec!["a", "d"]);
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = InMemoryDocumentStore::new();
        store.set_unavailable(true);

        assert!(matches!(
            store.get_document("paths", "x").await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
