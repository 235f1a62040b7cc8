//! Regional reservoir levels (read-only, maintained outside this system)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservoirState {
    Normal,
    Warning,
    Critical,
}

/// One reservoir; capacity and level in million cubic meters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservoir {
    pub name: String,
    pub capacity: f64,
    pub current_level: f64,
    pub percentage: f64,
    pub estimated_depletion: String,
    pub status: ReservoirState,
}

impl Reservoir {
    /// `0 <= percentage <= 100` and `currentLevel <= capacity`
    pub fn is_consistent(&self) -> bool {
        (0.0..=100.0).contains(&self.percentage) && self.current_level <= self.capacity
    }
}

/// Snapshot stored as `barajData/latest`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservoirStatus {
    #[serde(rename = "barajlar")]
    pub reservoirs: Vec<Reservoir>,
    pub average_percentage: f64,
    pub last_updated: String,
}
