//! In-memory document store
//!
//! Provides the [`DocumentStore`] operations over nested hash maps behind a
//! `tokio::sync::RwLock`. Used for local runs without cloud credentials and
//! as the reference backend in tests.

use super::{Direction, Document, DocumentStore, Query, StoreConnector};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

type Collections = HashMap<String, HashMap<String, Value>>;

/// In-memory store keyed by collection, then document id
pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of documents in a collection
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, HashMap::len)
    }

    /// Whether a collection holds no documents
    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn add(&self, collection: &str, data: Value) -> Result<String> {
        if !data.is_object() {
            return Err(Error::Store("documents must be JSON objects".to_string()));
        }
        let id = Uuid::new_v4().simple().to_string();
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        if !data.is_object() {
            return Err(Error::Store("documents must be JSON objects".to_string()));
        }
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<Document> = docs
            .iter()
            .filter(|(_, data)| match &query.filter {
                Some((field, expected)) => data.get(field) == Some(expected),
                None => true,
            })
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect();

        if let Some((field, direction)) = &query.order_by {
            matched.sort_by(|a, b| {
                let ord = compare_values(a.data.get(field), b.data.get(field));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Order field values the way the document store does for the types we
/// write: missing < null < numbers < strings. RFC 3339 timestamps are
/// strings and sort chronologically.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Connector handing out one shared [`MemoryStore`]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
    failure: Option<String>,
}

impl MemoryConnector {
    /// Connector over a fresh, empty store
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Connector over an existing (possibly pre-seeded) store
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            failure: None,
        }
    }

    /// Connector whose every connect attempt fails with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            failure: Some(reason.into()),
        }
    }

    /// The store this connector hands out
    pub fn store(&self) -> Arc<MemoryStore> {
        self.store.clone()
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>> {
        match &self.failure {
            Some(reason) => Err(Error::Init(reason.clone())),
            None => Ok(self.store.clone()),
        }
    }
}
