//! Time-bucketed trend series and dashboard filtering

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::incidents::Incident;

/// Look-back window selectable on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "24h")]
    Last24Hours,
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl TimeWindow {
    pub fn lookback(&self) -> Option<Duration> {
        match self {
            Self::Last24Hours => Some(Duration::hours(24)),
            Self::Last7Days => Some(Duration::days(7)),
            Self::Last30Days => Some(Duration::days(30)),
            Self::All => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Last24Hours => "24h",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::All => "all",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "24h" => Ok(Self::Last24Hours),
            "7d" => Ok(Self::Last7Days),
            "30d" => Ok(Self::Last30Days),
            "all" | "" => Ok(Self::All),
            other => Err(Error::Validation(format!(
                "unknown time window '{other}' (expected 24h, 7d, 30d or all)"
            ))),
        }
    }
}

/// Platform and time window selection applied before aggregation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardFilter {
    /// `None` or `"all"` selects every platform
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub window: TimeWindow,
}

impl DashboardFilter {
    pub fn new(platform: Option<String>, window: TimeWindow) -> Self {
        Self { platform, window }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.selected_platform().is_none() && self.window == TimeWindow::All
    }

    fn selected_platform(&self) -> Option<&str> {
        self.platform
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("all"))
    }

    pub fn matches(&self, incident: &Incident, now: DateTime<Utc>) -> bool {
        let platform_ok = self
            .selected_platform()
            .is_none_or(|p| incident.platform == p);
        let window_ok = self
            .window
            .lookback()
            .is_none_or(|lookback| incident.created_at >= now - lookback);
        platform_ok && window_ok
    }

    /// Matching incidents, preserving input order
    pub fn apply(&self, incidents: &[Incident], now: DateTime<Utc>) -> Vec<Incident> {
        incidents
            .iter()
            .filter(|i| self.matches(i, now))
            .cloned()
            .collect()
    }
}

/// Incidents opened on one UTC calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub total: usize,
    pub platforms: Vec<PlatformCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformCount {
    pub platform: String,
    pub count: usize,
    pub tickets: Vec<String>,
}

impl TrendPoint {
    pub fn platform(&self, name: &str) -> Option<&PlatformCount> {
        self.platforms.iter().find(|p| p.platform == name)
    }
}

/// Daily incident counts split by platform, oldest day first
pub fn daily_trend(incidents: &[Incident]) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<NaiveDate, TrendPoint> = BTreeMap::new();

    for incident in incidents {
        let date = incident.created_at.date_naive();
        let point = buckets.entry(date).or_insert_with(|| TrendPoint {
            date,
            total: 0,
            platforms: Vec::new(),
        });
        point.total += 1;

        match point
            .platforms
            .iter_mut()
            .find(|p| p.platform == incident.platform)
        {
            Some(entry) => {
                entry.count += 1;
                entry.tickets.push(incident.ticket_number.clone());
            }
            None => point.platforms.push(PlatformCount {
                platform: incident.platform.clone(),
                count: 1,
                tickets: vec![incident.ticket_number.clone()],
            }),
        }
    }

    buckets.into_values().collect()
}

/// Distinct platforms in order of first appearance
pub fn platforms(incidents: &[Incident]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for incident in incidents {
        if !seen.iter().any(|p| p == &incident.platform) {
            seen.push(incident.platform.clone());
        }
    }
    seen
}
