//! Konya Water - resilient data gateway for household water usage
//!
//! Residents of Konya report their water habits, get an analysis with
//! saving tips, keep household settings and follow regional reservoir
//! levels. All of that goes through [`DataGateway`], which never fails:
//! when the document store or the analysis service is unreachable it logs
//! the problem and answers with fixed demonstration data.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP API (axum)              CLI (clap)                  │
//! └──────────────┬──────────────────────────┬────────────────┘
//!                └────────────┬─────────────┘
//!                ┌────────────▼─────────────┐
//!                │        DataGateway        │── fallback values
//!                │  (errors → fallbacks)     │
//!                └──────┬─────────────┬─────┘
//!        ┌──────────────▼───┐   ┌─────▼────────────────┐
//!        │  GatewayHandle   │   │   AnalysisService    │
//!        │  lazy one-shot   │   │   chat completions   │
//!        │  store init      │   └──────────────────────┘
//!        └──────┬───────────┘
//!        ┌──────▼───────────────────────┐
//!        │ DocumentStore                │
//!        │  Firestore REST │ in-memory  │
//!        └──────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`gateway`]: the resilient operations, fallbacks and store initialization
//! - [`store`]: document store trait and backends
//! - [`analysis`]: text-generation analysis of usage records
//! - [`models`]: usage records, analyses, settings and reservoir data
//! - [`api`]: HTTP routes
//! - [`config`]: configuration management

pub mod analysis;
pub mod api;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod store;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use gateway::DataGateway;
