//! Derived statistics models for the incident dashboard

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::incidents::{Incident, Priority, Status};

/// Snapshot of dashboard statistics, recomputed on every change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentStats {
    pub total_incidents: usize,
    pub critical_incidents: usize,
    /// Mean time to resolution in hours
    pub mttr: f64,
    /// Percentage of incidents with a recorded resolution
    pub resolution_rate: f64,
    pub priority_distribution: Vec<PriorityCount>,
    pub status_distribution: Vec<StatusCount>,
    pub team_stats: Vec<TeamStat>,
    pub recent_incidents: Vec<Incident>,
}

impl IncidentStats {
    /// The "no data" snapshot
    pub fn empty() -> Self {
        Self {
            total_incidents: 0,
            critical_incidents: 0,
            mttr: 0.0,
            resolution_rate: 0.0,
            priority_distribution: Vec::new(),
            status_distribution: Vec::new(),
            team_stats: Vec::new(),
            recent_incidents: Vec::new(),
        }
    }

    pub fn priority_count(&self, priority: Priority) -> usize {
        self.priority_distribution
            .iter()
            .find(|p| p.priority == priority)
            .map_or(0, |p| p.count)
    }

    pub fn status_count(&self, status: Status) -> usize {
        self.status_distribution
            .iter()
            .find(|s| s.status == status)
            .map_or(0, |s| s.count)
    }

    pub fn team(&self, name: &str) -> Option<&TeamStat> {
        self.team_stats.iter().find(|t| t.name == name)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Team rollups as CSV, one row per team
    pub fn team_stats_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for team in &self.team_stats {
            writer.serialize(team)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| crate::error::Error::Other(format!("Failed to flush CSV: {e}")))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Default for IncidentStats {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCount {
    pub priority: Priority,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: Status,
    pub count: usize,
}

/// Per intervening team rollup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStat {
    pub name: String,
    pub mttr: f64,
    pub incidents: usize,
    pub resolved: usize,
    pub resolution_rate: f64,
}
