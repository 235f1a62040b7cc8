//! Analysis derived from a usage record

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// How far the breakdown percentages may drift from 100 before a
/// response is considered malformed
pub const BREAKDOWN_TOLERANCE: f64 = 2.0;

/// Score, breakdown and guidance for one usage record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// 0-100, lower is better
    pub water_usage_score: f64,
    pub total_liters_per_day: f64,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub comparison: Comparison,
    pub breakdown: Vec<BreakdownEntry>,
}

/// Daily liters for the user against the city average and the target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub user: f64,
    pub city_average: f64,
    pub recommended: f64,
}

/// Share of daily consumption attributed to one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub category: String,
    pub percentage: f64,
    pub liters: f64,
}

impl AnalysisResult {
    /// Sum of all breakdown percentages
    pub fn breakdown_total(&self) -> f64 {
        self.breakdown.iter().map(|b| b.percentage).sum()
    }

    /// Reject results a well-behaved analyst would never produce.
    ///
    /// The score must lie in 0..=100 and the breakdown must add up to 100
    /// within [`BREAKDOWN_TOLERANCE`].
    pub fn check_shape(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.water_usage_score) {
            return Err(Error::Malformed(format!(
                "waterUsageScore out of range: {}",
                self.water_usage_score
            )));
        }
        if self.breakdown.is_empty() {
            return Err(Error::Malformed("breakdown is empty".to_string()));
        }
        let total = self.breakdown_total();
        if (total - 100.0).abs() > BREAKDOWN_TOLERANCE {
            return Err(Error::Malformed(format!(
                "breakdown percentages sum to {}, expected 100",
                total
            )));
        }
        Ok(())
    }
}
