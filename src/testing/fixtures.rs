//! Incident fixtures

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::incidents::{Incident, Priority, Status};
use crate::notifications::{EmailMessage, Mailer};

/// Fluent builder for incident records with deterministic defaults
pub struct IncidentBuilder {
    incident: Incident,
}

impl IncidentBuilder {
    /// New `P2` incident in `NEW`, created 2024-01-01T00:00:00Z, team "Ops"
    pub fn new(id: &str) -> Self {
        Self {
            incident: Incident {
                id: id.to_string(),
                ticket_number: format!("INC-2024-{}", 10_000 + id.len()),
                title: format!("Incident {id}"),
                description: String::new(),
                platform: "Production".to_string(),
                status: Status::New,
                priority: Priority::P2,
                responsible_team: "Platform".to_string(),
                intervening_team: "Ops".to_string(),
                intervening_person: "On-call".to_string(),
                created_at: Self::epoch(),
                resolved_at: None,
                root_cause: None,
                solution_provided: None,
                location: None,
                impacted_business: None,
                problem_category: None,
                incident_start_time: None,
                incident_end_time: None,
                duration: None,
                responsible_team_email: None,
                intervening_person_email: None,
                rca_recipients: Vec::new(),
                reminder_count: 0,
            },
        }
    }

    /// Default creation time used by fixtures
    pub fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }

    pub fn ticket(mut self, ticket: &str) -> Self {
        self.incident.ticket_number = ticket.to_string();
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.incident.title = title.to_string();
        self
    }

    pub fn platform(mut self, platform: &str) -> Self {
        self.incident.platform = platform.to_string();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.incident.priority = priority;
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.incident.status = status;
        self
    }

    pub fn team(mut self, team: &str) -> Self {
        self.incident.intervening_team = team.to_string();
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.incident.created_at = at;
        self
    }

    pub fn resolved_at(mut self, at: DateTime<Utc>) -> Self {
        self.incident.resolved_at = Some(at);
        self
    }

    pub fn resolved_after_minutes(mut self, minutes: i64) -> Self {
        self.incident.resolved_at = Some(self.incident.created_at + Duration::minutes(minutes));
        self
    }

    pub fn contacts(mut self, person: &str, team: &str, rca: &[&str]) -> Self {
        self.incident.intervening_person_email = Some(person.to_string());
        self.incident.responsible_team_email = Some(team.to_string());
        self.incident.rca_recipients = rca.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> Incident {
        self.incident
    }
}

/// Mailer that keeps every message in memory
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn deliver(&self, message: &EmailMessage) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}
