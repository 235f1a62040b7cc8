//! Self-reported household water habits

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shortest shower the intake form accepts, in minutes
pub const MIN_SHOWER_MINUTES: u32 = 1;
/// Longest shower the intake form accepts, in minutes
pub const MAX_SHOWER_MINUTES: u32 = 30;

/// Teeth brushing, times per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrushingFrequency {
    Once,
    Twice,
    More,
}

/// Dishwasher, washing machine and garden watering, times per week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplianceFrequency {
    Never,
    Once,
    Twice,
    Thrice,
    Daily,
}

/// Car washing, times per month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarWashFrequency {
    Never,
    Once,
    Twice,
    Weekly,
}

/// One user's reported habits for a reporting period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub name: String,
    /// Minutes per shower
    pub shower_duration: u32,
    pub teeth_brushing: BrushingFrequency,
    pub dishwasher_usage: ApplianceFrequency,
    pub washing_machine_usage: ApplianceFrequency,
    pub garden_watering: ApplianceFrequency,
    pub car_washing: CarWashFrequency,
    /// Owner used by the history query; the intake form leaves it unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Default for UsageRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            shower_duration: 10,
            teeth_brushing: BrushingFrequency::Twice,
            dishwasher_usage: ApplianceFrequency::Twice,
            washing_machine_usage: ApplianceFrequency::Twice,
            garden_watering: ApplianceFrequency::Once,
            car_washing: CarWashFrequency::Never,
            user_id: None,
        }
    }
}

impl UsageRecord {
    /// Check the invariants the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("name is required".to_string()));
        }
        if !(MIN_SHOWER_MINUTES..=MAX_SHOWER_MINUTES).contains(&self.shower_duration) {
            return Err(Error::Validation(format!(
                "showerDuration must be between {} and {} minutes, got {}",
                MIN_SHOWER_MINUTES, MAX_SHOWER_MINUTES, self.shower_duration
            )));
        }
        Ok(())
    }
}

/// A usage record as it sits in the `waterUsage` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUsageRecord {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub record: UsageRecord,
    pub timestamp: DateTime<Utc>,
}
