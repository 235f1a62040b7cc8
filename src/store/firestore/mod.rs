//! Cloud Firestore backend over the REST v1 API
//!
//! Only the four calls the gateway needs are implemented: create with a
//! generated id, get by id, full-replace patch, and a structured query with
//! one equality filter, one ordering and a limit.

pub mod value;

use super::{Direction, Document, DocumentStore, Query, StoreConnector};
use crate::config::{resolve_secret, StoreConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::{json, Value};
use std::sync::Arc;

/// Firestore document store
pub struct FirestoreStore {
    client: Client,
    /// `{base}/projects/{project}/databases/{database}/documents`
    documents_url: String,
    api_key: String,
}

impl FirestoreStore {
    /// Create a store for one project and database
    pub fn new(
        client: Client,
        base_url: &str,
        project_id: &str,
        database: &str,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            documents_url: format!(
                "{}/projects/{}/databases/{}/documents",
                base_url.trim_end_matches('/'),
                project_id,
                database
            ),
            api_key: api_key.into(),
        }
    }

    fn collection_url(&self, collection: &str) -> Result<Url> {
        self.segments_url(&[collection])
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url> {
        self.segments_url(&[collection, id])
    }

    /// Append each segment percent-encoded, so `/`, `?` and `#` inside an
    /// id stay part of that id
    fn segments_url(&self, segments: &[&str]) -> Result<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(Error::Store(format!("invalid document path segment {:?}", bad)));
        }
        let mut url = Url::parse(&self.documents_url)
            .map_err(|e| Error::Store(format!("invalid store URL {}: {}", self.documents_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Store(format!("store URL {} cannot have a path", self.documents_url)))?
            .extend(segments);
        Ok(url)
    }

    fn run_query_url(&self) -> String {
        format!("{}:runQuery", self.documents_url)
    }

    /// Turn a non-success response into a store error carrying the body
    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Store(format!(
            "{} failed with {}: {}",
            what,
            status,
            body.chars().take(200).collect::<String>()
        )))
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn add(&self, collection: &str, data: Value) -> Result<String> {
        let body = value::encode_document(&data)?;
        let response = self
            .client
            .post(self.collection_url(collection)?)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, "create").await?;
        let created: Value = response.json().await?;
        let (id, _) = value::decode_document(&created)?;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let response = self
            .client
            .get(self.document_url(collection, id)?)
            .query(&[("key", &self.api_key)])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check(response, "get").await?;
        let doc: Value = response.json().await?;
        let (_, data) = value::decode_document(&doc)?;
        Ok(Some(data))
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        // A patch without an update mask replaces every field
        let body = value::encode_document(&data)?;
        let response = self
            .client
            .patch(self.document_url(collection, id)?)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;
        Self::check(response, "set").await?;
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let body = structured_query(collection, query);
        let response = self
            .client
            .post(self.run_query_url())
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, "runQuery").await?;
        let rows: Vec<Value> = response.json().await?;

        // Rows without a document only carry a readTime
        rows.iter()
            .filter_map(|row| row.get("document"))
            .map(|doc| value::decode_document(doc).map(|(id, data)| Document { id, data }))
            .collect()
    }

    fn name(&self) -> &str {
        "firestore"
    }
}

/// Build the `runQuery` request body
fn structured_query(collection: &str, query: &Query) -> Value {
    let mut structured = json!({
        "from": [{ "collectionId": collection }],
    });

    if let Some((field, expected)) = &query.filter {
        structured["where"] = json!({
            "fieldFilter": {
                "field": { "fieldPath": field },
                "op": "EQUAL",
                "value": value::encode(expected),
            }
        });
    }

    if let Some((field, direction)) = &query.order_by {
        let direction = match direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        structured["orderBy"] = json!([{
            "field": { "fieldPath": field },
            "direction": direction,
        }]);
    }

    if let Some(limit) = query.limit {
        structured["limit"] = json!(limit);
    }

    json!({ "structuredQuery": structured })
}

/// Opens a [`FirestoreStore`] from configuration and environment
pub struct FirestoreConnector {
    config: StoreConfig,
}

impl FirestoreConnector {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StoreConnector for FirestoreConnector {
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>> {
        let project_id = self
            .config
            .project_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| resolve_secret(&self.config.project_id_ref))
            .ok_or_else(|| {
                Error::Init(format!(
                    "Firestore project id not configured (set store.project_id or ${})",
                    self.config.project_id_ref.to_uppercase()
                ))
            })?;
        let api_key = resolve_secret(&self.config.api_key_ref).ok_or_else(|| {
            Error::Init(format!(
                "Firestore API key not found in ${}",
                self.config.api_key_ref.to_uppercase()
            ))
        })?;

        let client = Client::builder()
            .timeout(self.config.timeout())
            .build()
            .map_err(|e| Error::Init(format!("Failed to build HTTP client: {}", e)))?;

        tracing::info!(project = %project_id, database = %self.config.database, "Firestore store ready");

        Ok(Arc::new(FirestoreStore::new(
            client,
            &self.config.base_url,
            &project_id,
            &self.config.database,
            api_key,
        )))
    }
}
