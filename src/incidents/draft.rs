//! Incident report drafts, validation and ticket numbering

use chrono::{DateTime, Datelike, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::models::{Incident, Priority, Status};
use crate::analytics::duration::IncidentDuration;
use crate::error::{Error, Result};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Fields submitted when an incident is first reported
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidentDraft {
    #[serde(default)]
    pub ticket_number: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub platform: String,
    pub priority: Option<Priority>,
    pub responsible_team: String,
    #[serde(default)]
    pub responsible_team_email: String,
    #[serde(default)]
    pub intervening_team: String,
    #[serde(default)]
    pub intervening_person: String,
    #[serde(default)]
    pub intervening_person_email: String,
    #[serde(default)]
    pub impacted_business: Option<String>,
    #[serde(default)]
    pub problem_category: Option<String>,
    #[serde(default)]
    pub incident_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub incident_end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub root_cause: Option<String>,
    #[serde(default)]
    pub solution_provided: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Comma separated list of analysis recipients
    #[serde(default)]
    pub rca_recipients: String,
}

impl IncidentDraft {
    /// Priority used when the reporter does not pick one
    pub const DEFAULT_PRIORITY: Priority = Priority::P2;

    /// Check required fields and e-mail formats, returning the parsed recipient list
    pub fn validate(&self) -> Result<Vec<String>> {
        for (name, value) in [
            ("title", &self.title),
            ("platform", &self.platform),
            ("responsible_team", &self.responsible_team),
            ("intervening_team", &self.intervening_team),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("{name} is required")));
            }
        }

        if self.intervening_person_email.trim().is_empty()
            || self.responsible_team_email.trim().is_empty()
        {
            return Err(Error::Validation(
                "intervening person and responsible team e-mails are required".to_string(),
            ));
        }
        if !is_valid_email(&self.intervening_person_email) {
            return Err(Error::Validation(
                "invalid e-mail for the intervening person".to_string(),
            ));
        }
        if !is_valid_email(&self.responsible_team_email) {
            return Err(Error::Validation(
                "invalid e-mail for the responsible team".to_string(),
            ));
        }

        let recipients = parse_recipients(&self.rca_recipients);
        if recipients.iter().any(|email| !is_valid_email(email)) {
            return Err(Error::Validation(
                "invalid e-mail in the analysis recipients".to_string(),
            ));
        }

        if let (Some(start), Some(end)) = (self.incident_start_time, self.incident_end_time) {
            if end < start {
                return Err(Error::Validation(
                    "incident end time is before its start time".to_string(),
                ));
            }
        }

        Ok(recipients)
    }

    /// Duration text shown on the report, present once both bounds are known
    pub fn duration_text(&self) -> Option<String> {
        match (self.incident_start_time, self.incident_end_time) {
            (Some(start), Some(end)) => {
                Some(IncidentDuration::describe(Some(start), Some(end)).to_string())
            }
            _ => None,
        }
    }

    /// Build the incident record a store persists for this draft
    pub fn into_incident(self, id: String, created_at: DateTime<Utc>) -> Result<Incident> {
        let rca_recipients = self.validate()?;
        let duration = self.duration_text();
        let ticket_number = self
            .ticket_number
            .clone()
            .unwrap_or_else(|| generate_ticket_number(created_at));

        Ok(Incident {
            id,
            ticket_number,
            title: self.title.trim().to_string(),
            description: self.description,
            platform: self.platform.trim().to_string(),
            status: Status::New,
            priority: self.priority.unwrap_or(Self::DEFAULT_PRIORITY),
            responsible_team: self.responsible_team.trim().to_string(),
            intervening_team: self.intervening_team.trim().to_string(),
            intervening_person: self.intervening_person.trim().to_string(),
            created_at,
            resolved_at: None,
            root_cause: non_blank(self.root_cause),
            solution_provided: non_blank(self.solution_provided),
            location: non_blank(self.location),
            impacted_business: non_blank(self.impacted_business),
            problem_category: non_blank(self.problem_category),
            incident_start_time: self.incident_start_time,
            incident_end_time: self.incident_end_time,
            duration,
            responsible_team_email: Some(self.responsible_team_email.trim().to_string()),
            intervening_person_email: Some(self.intervening_person_email.trim().to_string()),
            rca_recipients,
            reminder_count: 0,
        })
    }
}

/// Ticket numbers look like `INC-2024-48213`
pub fn generate_ticket_number(at: DateTime<Utc>) -> String {
    let suffix: u32 = rand::rng().random_range(10_000..=99_999);
    format!("INC-{}-{}", at.year(), suffix)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Split a comma separated address list, dropping empty entries
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
