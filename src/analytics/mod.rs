//! Incident analytics
//!
//! Derives the dashboard's headline figures, distributions, per-team rollups and
//! daily trend from the current incident list.

pub mod duration;
pub mod engine;
pub mod models;
pub mod trend;

pub use duration::{DurationSummary, IncidentDuration};
pub use engine::{aggregate, StatsAggregator, RECENT_INCIDENTS};
pub use models::*;
pub use trend::{daily_trend, platforms, DashboardFilter, PlatformCount, TimeWindow, TrendPoint};
