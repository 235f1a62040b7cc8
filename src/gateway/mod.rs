//! Resilient data gateway
//!
//! Every public operation here completes with a usable value. Store and
//! analysis failures are logged and replaced by the values in
//! [`fallback`]; nothing is surfaced to the caller.

pub mod fallback;
pub mod init;

pub use fallback::{fallback_analysis, fallback_record_id, fallback_reservoirs, FALLBACK_ID_PREFIX};
pub use init::{GatewayHandle, InitPhase};

use crate::analysis::{AnalysisService, OpenAiAnalyzer, UnavailableAnalyzer};
use crate::config::{AnalysisConfig, AppConfig, StoreBackend};
use crate::error::{Error, Result};
use crate::models::{AnalysisResult, FamilySettings, ReservoirStatus, StoredUsageRecord, UsageRecord};
use crate::store::{
    self, Direction, Document, FirestoreConnector, MemoryConnector, Query, StoreConnector,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;

/// Newest records considered by the history query
pub const HISTORY_LIMIT: usize = 30;

/// Outcome of the intake flow
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intake {
    /// Id of the stored usage record, or a fallback id
    pub id: String,
    pub analysis: AnalysisResult,
}

/// Front door for reading and writing usage, settings and reservoir data
pub struct DataGateway {
    handle: GatewayHandle,
    analyzer: Arc<dyn AnalysisService>,
}

impl DataGateway {
    pub fn new(handle: GatewayHandle, analyzer: Arc<dyn AnalysisService>) -> Self {
        Self { handle, analyzer }
    }

    /// Build the store connector and analyzer the configuration asks for.
    ///
    /// Nothing is contacted here; the store is opened on first use.
    pub fn from_config(config: &AppConfig) -> Self {
        let connector: Arc<dyn StoreConnector> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryConnector::new()),
            StoreBackend::Firestore => Arc::new(FirestoreConnector::new(config.store.clone())),
        };
        let handle = GatewayHandle::new(connector, &config.gateway);
        Self::new(handle, analyzer_from_config(&config.analysis))
    }

    pub fn handle(&self) -> &GatewayHandle {
        &self.handle
    }

    pub fn init_phase(&self) -> InitPhase {
        self.handle.phase()
    }

    /// Store a usage record and return its id.
    pub async fn submit_usage_record(&self, record: &UsageRecord) -> String {
        resilient(
            "submit_usage_record",
            store::WATER_USAGE,
            self.try_submit(record),
            fallback_record_id,
        )
        .await
    }

    /// Analyze a usage record.
    ///
    /// A live analysis is also written to the `analysis` collection on a
    /// best-effort basis.
    pub async fn analyze_usage(&self, record: &UsageRecord) -> AnalysisResult {
        let Some(analysis) = self.live_analysis(record).await else {
            return fallback_analysis().clone();
        };

        resilient(
            "persist_analysis",
            store::ANALYSIS,
            self.try_persist_analysis(record, &analysis, None),
            || (),
        )
        .await;

        analysis
    }

    /// Read a stored analysis by id.
    pub async fn get_analysis(&self, id: &str) -> AnalysisResult {
        resilient(
            "get_analysis",
            store::ANALYSIS,
            self.try_get_analysis(id),
            || fallback_analysis().clone(),
        )
        .await
    }

    /// Replace the household settings stored for `user_id`.
    pub async fn upsert_family_settings(&self, user_id: &str, settings: &FamilySettings) {
        resilient(
            "upsert_family_settings",
            store::FAMILY_SETTINGS,
            self.try_upsert_settings(user_id, settings),
            || (),
        )
        .await
    }

    /// Current reservoir snapshot.
    pub async fn get_reservoir_status(&self) -> ReservoirStatus {
        resilient(
            "get_reservoir_status",
            store::RESERVOIRS,
            self.try_get_reservoirs(),
            || fallback_reservoirs().clone(),
        )
        .await
    }

    /// Historical series for charts.
    ///
    /// Always `None` for now: an empty or failed query has nothing to
    /// show, and turning stored records into a chart series is not
    /// implemented, so callers draw their own demonstration series.
    pub async fn get_usage_history(&self, user_id: &str) -> Option<Vec<StoredUsageRecord>> {
        let records = self.recent_usage_records(user_id).await;
        if !records.is_empty() {
            tracing::debug!(
                user_id,
                count = records.len(),
                "Usage history found but series aggregation is not implemented"
            );
        }
        None
    }

    /// The newest stored records for `user_id`, newest first. Empty when
    /// the store is unavailable.
    pub async fn recent_usage_records(&self, user_id: &str) -> Vec<StoredUsageRecord> {
        resilient(
            "recent_usage_records",
            store::WATER_USAGE,
            self.try_query_history(user_id),
            Vec::new,
        )
        .await
    }

    /// Intake flow: store the record, analyze it and keep the analysis
    /// under the record's id so [`get_analysis`](Self::get_analysis) finds
    /// it later.
    pub async fn record_and_analyze(&self, record: &UsageRecord) -> Intake {
        let id = self.submit_usage_record(record).await;

        let Some(analysis) = self.live_analysis(record).await else {
            return Intake {
                id,
                analysis: fallback_analysis().clone(),
            };
        };

        if id.starts_with(FALLBACK_ID_PREFIX) {
            tracing::warn!(id = %id, "Usage record was not stored; analysis kept in memory only");
        } else {
            resilient(
                "persist_analysis",
                store::ANALYSIS,
                self.try_persist_analysis(record, &analysis, Some(&id)),
                || (),
            )
            .await;
        }

        Intake { id, analysis }
    }

    async fn live_analysis(&self, record: &UsageRecord) -> Option<AnalysisResult> {
        let outcome = self.analyzer.analyze(record).await;
        match outcome {
            Ok(analysis) => {
                tracing::info!(
                    operation = "analyze_usage",
                    analyzer = self.analyzer.name(),
                    score = analysis.water_usage_score,
                    "Gateway operation succeeded"
                );
                Some(analysis)
            }
            Err(e) => {
                tracing::error!(
                    operation = "analyze_usage",
                    analyzer = self.analyzer.name(),
                    error = %e,
                    "Gateway operation failed; using fallback"
                );
                None
            }
        }
    }

    async fn try_submit(&self, record: &UsageRecord) -> Result<String> {
        let db = self.handle.ensure_ready().await?;
        let doc = with_field(serde_json::to_value(record)?, "timestamp", now())?;
        db.add(store::WATER_USAGE, doc).await
    }

    async fn try_persist_analysis(
        &self,
        record: &UsageRecord,
        analysis: &AnalysisResult,
        id: Option<&str>,
    ) -> Result<()> {
        let db = self.handle.ensure_ready().await?;
        let doc = json!({
            "waterUsageData": record,
            "analysis": analysis,
            "timestamp": now(),
        });
        match id {
            Some(id) => db.set(store::ANALYSIS, id, doc).await,
            None => db.add(store::ANALYSIS, doc).await.map(|_| ()),
        }
    }

    async fn try_get_analysis(&self, id: &str) -> Result<AnalysisResult> {
        let db = self.handle.ensure_ready().await?;
        let mut doc = db
            .get(store::ANALYSIS, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("analysis/{}", id)))?;
        let analysis = doc
            .get_mut("analysis")
            .map(Value::take)
            .ok_or_else(|| Error::Malformed(format!("analysis/{} has no analysis field", id)))?;
        serde_json::from_value(analysis)
            .map_err(|e| Error::Malformed(format!("analysis/{}: {}", id, e)))
    }

    async fn try_upsert_settings(&self, user_id: &str, settings: &FamilySettings) -> Result<()> {
        let db = self.handle.ensure_ready().await?;
        let doc = with_field(serde_json::to_value(settings)?, "updatedAt", now())?;
        db.set(store::FAMILY_SETTINGS, user_id, doc).await
    }

    async fn try_get_reservoirs(&self) -> Result<ReservoirStatus> {
        let db = self.handle.ensure_ready().await?;
        let doc = db
            .get(store::RESERVOIRS, store::LATEST_RESERVOIRS)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("{}/{}", store::RESERVOIRS, store::LATEST_RESERVOIRS))
            })?;
        serde_json::from_value(doc)
            .map_err(|e| Error::Malformed(format!("reservoir snapshot: {}", e)))
    }

    async fn try_query_history(&self, user_id: &str) -> Result<Vec<StoredUsageRecord>> {
        let db = self.handle.ensure_ready().await?;
        let query = Query::new()
            .where_eq("userId", user_id)
            .order_by("timestamp", Direction::Descending)
            .limit(HISTORY_LIMIT);
        let docs = db.query(store::WATER_USAGE, &query).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| match stored_record(doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping undecodable usage record");
                    None
                }
            })
            .collect())
    }
}

impl std::fmt::Debug for DataGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataGateway")
            .field("handle", &self.handle)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

/// Pick the analyzer for `config`; a disabled service or a missing key
/// yields an analyzer that always falls back.
pub fn analyzer_from_config(config: &AnalysisConfig) -> Arc<dyn AnalysisService> {
    if !config.enabled {
        return Arc::new(UnavailableAnalyzer::new("analysis is disabled"));
    }
    match OpenAiAnalyzer::from_config(config) {
        Ok(analyzer) => Arc::new(analyzer),
        Err(e) => {
            tracing::warn!(error = %e, "Analysis service not configured; fallback analysis will be served");
            Arc::new(UnavailableAnalyzer::new(e.to_string()))
        }
    }
}

/// Collapse a fallible step into a value, logging the outcome.
async fn resilient<T, F>(
    operation: &'static str,
    collection: &'static str,
    step: F,
    fallback: impl FnOnce() -> T,
) -> T
where
    F: Future<Output = Result<T>>,
{
    match step.await {
        Ok(value) => {
            tracing::info!(operation, collection, "Gateway operation succeeded");
            value
        }
        Err(e) => {
            tracing::error!(
                operation,
                collection,
                error = %e,
                "Gateway operation failed; using fallback"
            );
            fallback()
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn with_field(mut doc: Value, field: &str, value: impl Into<Value>) -> Result<Value> {
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| Error::Internal("document must serialize to an object".to_string()))?;
    obj.insert(field.to_string(), value.into());
    Ok(doc)
}

fn stored_record(doc: Document) -> Result<StoredUsageRecord> {
    let Document { id, data } = doc;
    let data = with_field(data, "id", id.clone())?;
    serde_json::from_value(data).map_err(|e| Error::Malformed(format!("waterUsage/{}: {}", id, e)))
}
