//! Usage analysis through an external text-generation service
//!
//! The gateway only sees the [`AnalysisService`] trait. The production
//! implementation is [`OpenAiAnalyzer`]; the other two exist for offline
//! runs and tests.

pub mod openai;
pub mod prompt;

pub use openai::OpenAiAnalyzer;

use crate::error::{Error, Result};
use crate::models::{AnalysisResult, UsageRecord};
use async_trait::async_trait;

/// Produces an [`AnalysisResult`] for a usage record.
///
/// Implementations return errors freely; the gateway decides what the
/// caller sees.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, record: &UsageRecord) -> Result<AnalysisResult>;

    /// Human-readable name for this service (used in logs).
    fn name(&self) -> &str;
}

/// Analyzer used when no text-generation service is configured
pub struct UnavailableAnalyzer {
    reason: String,
}

impl UnavailableAnalyzer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl AnalysisService for UnavailableAnalyzer {
    async fn analyze(&self, _record: &UsageRecord) -> Result<AnalysisResult> {
        Err(Error::Analysis(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Analyzer that always answers with the same result
pub struct StaticAnalyzer {
    result: AnalysisResult,
}

impl StaticAnalyzer {
    pub fn new(result: AnalysisResult) -> Self {
        Self { result }
    }
}

#[async_trait]
impl AnalysisService for StaticAnalyzer {
    async fn analyze(&self, _record: &UsageRecord) -> Result<AnalysisResult> {
        Ok(self.result.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable_analyzer_errors() {
        let analyzer = UnavailableAnalyzer::new("analysis disabled");
        let err = analyzer.analyze(&UsageRecord::default()).await.unwrap_err();
        assert!(err.to_string().contains("analysis disabled"));
    }
}
