//! # incidash
//!
//! Back end for an incident-tracking dashboard: report operational incidents,
//! triage them, and aggregate dashboard statistics (MTTR, resolution rate,
//! distributions, per-team rollups and daily trends).
//!
//! ## Usage
//!
//! ```bash
//! incidash stats --input incidents.json
//! incidash serve --port 3000
//! ```
//!
//! ## Modules
//!
//! - `analytics` - Statistics aggregation, incident durations and trend series
//! - `app` - Logging setup, runtime wiring and fatal error reporting
//! - `config` - TOML configuration with environment overrides
//! - `dashboard` - Snapshot service refreshed on every store change
//! - `incidents` - Incident records, report drafts and status transitions
//! - `notifications` - New-incident, critical and reminder e-mails
//! - `server` - REST API over the dashboard service
//! - `store` - Incident persistence backends and the change feed
//! - `testing` - Builders and fakes shared by tests and benchmarks
pub mod analytics;
pub mod app;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod incidents;
pub mod notifications;
pub mod server;
pub mod store;

pub mod testing;

#[cfg(test)]
mod property_tests;

pub use error::{Error, Result};
