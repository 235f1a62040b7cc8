//! Document store abstraction
//!
//! The gateway talks to a schemaless document store through the
//! [`DocumentStore`] trait. Opening the store is a separate, one-shot step
//! behind [`StoreConnector`] so the gateway can drive it lazily.
//!
//! ## Collections
//!
//! | Collection       | Key               | Content                            |
//! |------------------|-------------------|------------------------------------|
//! | `waterUsage`     | generated         | usage record + `timestamp`         |
//! | `analysis`       | generated / usage | record + analysis + `timestamp`    |
//! | `familySettings` | user id           | settings + `updatedAt`             |
//! | `barajData`      | `latest`          | reservoir snapshot                 |

pub mod firestore;
pub mod memory;

pub use firestore::{FirestoreConnector, FirestoreStore};
pub use memory::{MemoryConnector, MemoryStore};

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const WATER_USAGE: &str = "waterUsage";
pub const ANALYSIS: &str = "analysis";
pub const FAMILY_SETTINGS: &str = "familySettings";
pub const RESERVOIRS: &str = "barajData";
/// Document id of the current reservoir snapshot
pub const LATEST_RESERVOIRS: &str = "latest";

/// Sort direction for [`Query::order_by`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Single-field equality filter, optional ordering and a limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = Some((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A document returned by a query
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Remote document store operations.
///
/// Documents are JSON objects. Implementations report transport and
/// decoding problems as errors; absence is `Ok(None)`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document under a server-assigned id and return the id.
    async fn add(&self, collection: &str, data: Value) -> Result<String>;

    /// Read one document.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Create or fully replace the document at `id`.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<()>;

    /// Run a query against one collection.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    /// Human-readable backend name (used in logs).
    fn name(&self) -> &str;
}

/// Opens a [`DocumentStore`]. Called at most once per successful
/// initialization.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .where_eq("userId", "u-1")
            .order_by("timestamp", Direction::Descending)
            .limit(30);
        assert_eq!(query.filter, Some(("userId".to_string(), Value::from("u-1"))));
        assert_eq!(
            query.order_by,
            Some(("timestamp".to_string(), Direction::Descending))
        );
        assert_eq!(query.limit, Some(30));
    }
}
