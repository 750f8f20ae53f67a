//! Statistics aggregation over the current incident list

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

use super::models::{IncidentStats, PriorityCount, StatusCount, TeamStat};
use crate::incidents::{Incident, Priority, Status};

/// Number of incidents surfaced in the "recent" panel
pub const RECENT_INCIDENTS: usize = 5;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Computes dashboard statistics from a list of incidents
///
/// Aggregation is a pure function of its input: incidents are never mutated
/// and the list is never re-sorted. The caller supplies the list newest first.
#[derive(Debug, Clone, Copy)]
pub struct StatsAggregator {
    recent_limit: usize,
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self {
            recent_limit: RECENT_INCIDENTS,
        }
    }
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a fresh snapshot for `incidents`
    ///
    /// `now` is part of the contract so callers need not special-case it, but
    /// no field of the snapshot depends on it: MTTR only counts incidents that
    /// are already resolved.
    pub fn aggregate(&self, incidents: &[Incident], _now: DateTime<Utc>) -> IncidentStats {
        if incidents.is_empty() {
            return IncidentStats::empty();
        }

        let critical_incidents = incidents.iter().filter(|i| i.is_critical()).count();
        let overall = ResolutionSummary::over(incidents.iter());

        let priority_distribution = Priority::ALL
            .into_iter()
            .map(|priority| PriorityCount {
                priority,
                count: incidents.iter().filter(|i| i.priority == priority).count(),
            })
            .collect();

        let status_distribution = Status::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: incidents.iter().filter(|i| i.status == status).count(),
            })
            .collect();

        let team_stats = Self::team_rollups(incidents);

        let recent_incidents = incidents
            .iter()
            .take(self.recent_limit)
            .cloned()
            .collect();

        debug!(
            "Aggregated {} incidents ({} resolved, {} teams, mttr {:.2}h)",
            incidents.len(),
            overall.resolved,
            team_stats.len(),
            overall.mttr
        );

        IncidentStats {
            total_incidents: incidents.len(),
            critical_incidents,
            mttr: overall.mttr,
            resolution_rate: overall.resolution_rate,
            priority_distribution,
            status_distribution,
            team_stats,
            recent_incidents,
        }
    }

    /// Group by intervening team in order of first appearance
    fn team_rollups(incidents: &[Incident]) -> Vec<TeamStat> {
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<&Incident>> = HashMap::new();

        for incident in incidents {
            let team = incident.intervening_team.as_str();
            groups
                .entry(team)
                .or_insert_with(|| {
                    order.push(team);
                    Vec::new()
                })
                .push(incident);
        }

        order
            .into_iter()
            .map(|team| {
                let members = groups.remove(team).unwrap_or_default();
                let summary = ResolutionSummary::over(members.into_iter());
                TeamStat {
                    name: team.to_string(),
                    mttr: summary.mttr,
                    incidents: summary.total,
                    resolved: summary.resolved,
                    resolution_rate: summary.resolution_rate,
                }
            })
            .collect()
    }
}

/// Aggregate statistics for `incidents` with the default recent limit
pub fn aggregate(incidents: &[Incident], now: DateTime<Utc>) -> IncidentStats {
    StatsAggregator::default().aggregate(incidents, now)
}

/// Resolution figures shared by the global and per-team rollups
#[derive(Debug, Clone, Copy, PartialEq)]
struct ResolutionSummary {
    total: usize,
    resolved: usize,
    mttr: f64,
    resolution_rate: f64,
}

impl ResolutionSummary {
    fn over<'a>(incidents: impl Iterator<Item = &'a Incident>) -> Self {
        let mut total = 0usize;
        let mut resolved = 0usize;
        // Inverted timestamps contribute negatively; they are not filtered.
        let mut resolution_millis: i64 = 0;

        for incident in incidents {
            total += 1;
            if let Some(millis) = incident.resolution_millis() {
                resolved += 1;
                resolution_millis = resolution_millis.saturating_add(millis);
            }
        }

        let mttr = if resolved == 0 {
            0.0
        } else {
            resolution_millis as f64 / (resolved as f64 * MILLIS_PER_HOUR)
        };
        let resolution_rate = if total == 0 {
            0.0
        } else {
            resolved as f64 / total as f64 * 100.0
        };

        Self {
            total,
            resolved,
            mttr,
            resolution_rate,
        }
    }
}
