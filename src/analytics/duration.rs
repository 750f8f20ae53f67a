//! Per-incident duration reporting

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::incidents::Incident;

const MILLIS_PER_MINUTE: i64 = 60_000;

/// How long an incident lasted, as shown on the detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IncidentDuration {
    /// No start time was recorded
    Unspecified,
    /// Started but not yet ended
    InProgress,
    /// Whole hours and remaining whole minutes
    Elapsed { hours: i64, minutes: i64 },
}

impl IncidentDuration {
    /// Describe the span between `start` and `end`
    ///
    /// The difference is taken in milliseconds, made absolute, and truncated to
    /// whole minutes; it is never rounded.
    pub fn describe(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        match (start, end) {
            (None, _) => Self::Unspecified,
            (Some(_), None) => Self::InProgress,
            (Some(start), Some(end)) => Self::from_millis((end - start).num_milliseconds()),
        }
    }

    /// Running duration of an open incident as of `now`
    pub fn elapsed(start: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::from_millis((now - start).num_milliseconds())
    }

    /// Duration recorded on an incident's start and end times
    pub fn for_incident(incident: &Incident) -> Self {
        Self::describe(incident.incident_start_time, incident.incident_end_time)
    }

    pub fn total_minutes(&self) -> Option<i64> {
        match self {
            Self::Elapsed { hours, minutes } => Some(hours * 60 + minutes),
            _ => None,
        }
    }

    fn from_millis(millis: i64) -> Self {
        let total_minutes = millis.saturating_abs() / MILLIS_PER_MINUTE;
        Self::Elapsed {
            hours: total_minutes / 60,
            minutes: total_minutes % 60,
        }
    }
}

/// Recorded duration of an incident plus, while it is open, the time elapsed so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationSummary {
    pub recorded: IncidentDuration,
    pub elapsed: Option<IncidentDuration>,
}

impl DurationSummary {
    pub fn for_incident(incident: &Incident, now: DateTime<Utc>) -> Self {
        let recorded = IncidentDuration::for_incident(incident);
        let elapsed = match (recorded, incident.incident_start_time) {
            (IncidentDuration::InProgress, Some(start)) => {
                Some(IncidentDuration::elapsed(start, now))
            }
            _ => None,
        };
        Self { recorded, elapsed }
    }
}

impl fmt::Display for IncidentDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unspecified => f.write_str("unspecified"),
            Self::InProgress => f.write_str("in progress"),
            Self::Elapsed { hours, minutes } => write!(f, "{hours}h {minutes}m"),
        }
    }
}
