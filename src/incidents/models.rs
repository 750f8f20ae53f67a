//! Data models for tracked incidents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Incident priority, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
    P4,
}

impl Priority {
    /// Every priority in presentation order
    pub const ALL: [Priority; 5] = [
        Priority::P0,
        Priority::P1,
        Priority::P2,
        Priority::P3,
        Priority::P4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P0 => "P0",
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Self::P0)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Validation(format!("unknown priority: {s}")))
    }
}

/// Incident workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    New,
    InProgress,
    Resolved,
    Closed,
}

impl Status {
    /// Every status in presentation order
    pub const ALL: [Status; 4] = [
        Status::New,
        Status::InProgress,
        Status::Resolved,
        Status::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Status::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Validation(format!("unknown status: {s}")))
    }
}

/// A tracked operational incident as persisted by the incident store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    #[serde(default)]
    pub ticket_number: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub platform: String,
    pub status: Status,
    pub priority: Priority,
    #[serde(default)]
    pub responsible_team: String,
    #[serde(default)]
    pub intervening_team: String,
    #[serde(default)]
    pub intervening_person: String,
    pub created_at: DateTime<Utc>,
    /// Set if and only if the incident has been marked resolved
    #[serde(default, with = "optional_timestamp")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_provided: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impacted_business: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_category: Option<String>,
    #[serde(default, with = "optional_timestamp", skip_serializing_if = "Option::is_none")]
    pub incident_start_time: Option<DateTime<Utc>>,
    #[serde(default, with = "optional_timestamp", skip_serializing_if = "Option::is_none")]
    pub incident_end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_team_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intervening_person_email: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rca_recipients: Vec<String>,
    #[serde(default)]
    pub reminder_count: u32,
}

impl Incident {
    /// Whether a resolution timestamp has been recorded
    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    /// P0 incidents count as critical until they are closed
    pub fn is_critical(&self) -> bool {
        self.priority.is_critical() && self.status != Status::Closed
    }

    /// Milliseconds between creation and resolution, possibly negative
    pub fn resolution_millis(&self) -> Option<i64> {
        self.resolved_at
            .map(|resolved| (resolved - self.created_at).num_milliseconds())
    }

    /// Whether the post-incident analysis fields are still empty
    pub fn is_missing_analysis(&self) -> bool {
        let blank = |field: &Option<String>| field.as_deref().is_none_or(|s| s.trim().is_empty());
        blank(&self.root_cause) || blank(&self.solution_provided)
    }
}

/// Decode a JSON array of incidents, failing on the first malformed record
pub fn decode_incidents(json: &str) -> Result<Vec<Incident>> {
    Ok(serde_json::from_str(json)?)
}

/// Optional RFC 3339 timestamps where `null` and `""` both mean absent
pub(crate) mod optional_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(|dt| dt.to_rfc3339()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => DateTime::parse_from_rfc3339(value)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| de::Error::custom(format!("invalid timestamp {value:?}: {e}"))),
        }
    }
}
