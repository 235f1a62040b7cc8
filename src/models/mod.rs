//! Data model shared by the gateway, the store backends and the API
//!
//! All wire types serialize with camelCase keys so documents written by
//! this crate stay readable by the web front end that shares the store.

mod analysis;
mod family;
mod reservoir;
mod usage;

pub use analysis::{AnalysisResult, BreakdownEntry, Comparison, BREAKDOWN_TOLERANCE};
pub use family::{FamilySettings, FamilySize, HomeType, Region, YesNo};
pub use reservoir::{Reservoir, ReservoirState, ReservoirStatus};
pub use usage::{
    ApplianceFrequency, BrushingFrequency, CarWashFrequency, StoredUsageRecord, UsageRecord,
    MAX_SHOWER_MINUTES, MIN_SHOWER_MINUTES,
};
