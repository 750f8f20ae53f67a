//! Integration tests for statistics aggregation over decoded incident lists

use chrono::{TimeZone, Utc};
use incidash::analytics::{aggregate, IncidentDuration, IncidentStats};
use incidash::incidents::{decode_incidents, Priority, Status};
use incidash::testing::IncidentBuilder;
use serde_json::json;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn incident_json(id: &str, priority: &str, status: &str, team: &str) -> serde_json::Value {
    json!({
        "id": id,
        "ticket_number": format!("INC-2024-{}", 10_000 + id.len()),
        "title": format!("Incident {id}"),
        "description": "",
        "platform": "Production",
        "status": status,
        "priority": priority,
        "responsible_team": "Platform",
        "intervening_team": team,
        "intervening_person": "Sam",
        "created_at": "2024-01-01T00:00:00Z",
        "resolved_at": null
    })
}

#[test]
fn test_scenario_unresolved_p0_is_critical() {
    let raw = json!([incident_json("a", "P0", "NEW", "Ops")]).to_string();
    let incidents = decode_incidents(&raw).unwrap();
    let stats = aggregate(&incidents, now());

    assert_eq!(stats.critical_incidents, 1);
    assert_eq!(stats.mttr, 0.0);
    assert_eq!(stats.resolution_rate, 0.0);
}

#[test]
fn test_scenario_team_rollup() {
    let mut resolved = incident_json("a", "P2", "RESOLVED", "Ops");
    resolved["resolved_at"] = json!("2024-01-01T02:00:00Z");
    let open = incident_json("b", "P2", "IN_PROGRESS", "Ops");

    let incidents = decode_incidents(&json!([resolved, open]).to_string()).unwrap();
    let stats = aggregate(&incidents, now());

    let ops = stats.team("Ops").expect("Ops rollup");
    assert_eq!(ops.incidents, 2);
    assert_eq!(ops.resolved, 1);
    assert_eq!(ops.resolution_rate, 50.0);
    assert_eq!(ops.mttr, 2.0);
}

#[test]
fn test_scenario_mttr_in_hours() {
    let mut record = incident_json("a", "P1", "RESOLVED", "Ops");
    record["resolved_at"] = json!("2024-01-01T03:30:00Z");

    let incidents = decode_incidents(&json!([record]).to_string()).unwrap();
    assert_eq!(aggregate(&incidents, now()).mttr, 3.5);
}

#[test]
fn test_scenario_closed_p0_is_not_critical() {
    let mut records: Vec<_> = (0..5)
        .map(|i| incident_json(&format!("p0-{i}"), "P0", "CLOSED", "Ops"))
        .collect();
    records.push(incident_json("p1", "P1", "CLOSED", "Ops"));

    let incidents = decode_incidents(&json!(records).to_string()).unwrap();
    let stats = aggregate(&incidents, now());

    assert_eq!(stats.critical_incidents, 0);
    let counts: Vec<_> = stats
        .priority_distribution
        .iter()
        .map(|p| (p.priority.as_str(), p.count))
        .collect();
    assert_eq!(
        counts,
        vec![("P0", 5), ("P1", 1), ("P2", 0), ("P3", 0), ("P4", 0)]
    );
    // CLOSED without resolved_at does not count as resolved
    assert_eq!(stats.resolution_rate, 0.0);
}

#[test]
fn test_empty_string_resolution_is_absent() {
    let mut record = incident_json("a", "P2", "CLOSED", "Ops");
    record["resolved_at"] = json!("");

    let incidents = decode_incidents(&json!([record]).to_string()).unwrap();
    assert!(incidents[0].resolved_at.is_none());
    assert_eq!(aggregate(&incidents, now()).resolution_rate, 0.0);
}

#[test]
fn test_malformed_timestamp_fails_the_load() {
    let mut record = incident_json("a", "P2", "RESOLVED", "Ops");
    record["resolved_at"] = json!("2024-13-45 25:00");

    let err = decode_incidents(&json!([record]).to_string()).unwrap_err();
    assert!(err.to_string().contains("invalid timestamp"));
}

#[test]
fn test_empty_list_yields_no_data_snapshot() {
    let stats = aggregate(&[], now());
    assert_eq!(stats, IncidentStats::empty());

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["priorityDistribution"], json!([]));
    assert_eq!(json["teamStats"], json!([]));
}

#[test]
fn test_snapshot_json_shape() {
    let incidents = vec![
        IncidentBuilder::new("a")
            .priority(Priority::P0)
            .status(Status::Resolved)
            .resolved_after_minutes(90)
            .build(),
        IncidentBuilder::new("b").team("Network").build(),
    ];
    let json = serde_json::to_value(aggregate(&incidents, now())).unwrap();

    assert_eq!(json["totalIncidents"], 2);
    assert_eq!(json["criticalIncidents"], 1);
    assert_eq!(json["mttr"], 1.5);
    assert_eq!(json["resolutionRate"], 50.0);
    assert_eq!(json["priorityDistribution"][0], json!({"priority": "P0", "count": 1}));
    assert_eq!(
        json["statusDistribution"][1],
        json!({"status": "IN_PROGRESS", "count": 0})
    );
    assert_eq!(json["teamStats"][0]["name"], "Ops");
    assert_eq!(json["teamStats"][0]["resolutionRate"], 100.0);
    assert_eq!(json["teamStats"][1]["name"], "Network");
    assert_eq!(json["recentIncidents"][0]["id"], "a");
}

#[test]
fn test_duration_helper_agrees_with_mttr_arithmetic() {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 1, 3, 30, 0).unwrap();
    assert_eq!(
        IncidentDuration::describe(Some(start), Some(end)).to_string(),
        "3h 30m"
    );
    assert_eq!(IncidentDuration::describe(Some(start), None).to_string(), "in progress");
    assert_eq!(IncidentDuration::describe(None, Some(end)).to_string(), "unspecified");
}
