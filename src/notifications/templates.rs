//! HTML bodies for outgoing e-mails

use tera::{Context, Tera};

use crate::analytics::IncidentDuration;
use crate::error::Result;
use crate::incidents::Incident;

const NEW_INCIDENT: &str = "new_incident.html";
const CRITICAL_ALERT: &str = "critical_alert.html";
const REMINDER: &str = "reminder.html";

const NEW_INCIDENT_TEMPLATE: &str = r#"<h1>New incident: {{ title }}</h1>
<p><strong>Ticket:</strong> {{ ticket_number }}</p>
<p><strong>Description:</strong> {{ description }}</p>
<p><strong>Platform:</strong> {{ platform }}</p>
<p><strong>Impacted business:</strong> {{ impacted_business }}</p>
<p><strong>Priority:</strong> {{ priority }}</p>
<p><strong>Status:</strong> {{ status }}</p>
<p><strong>Responsible team:</strong> {{ responsible_team }}</p>
<h2>Timeline</h2>
<p><strong>Started:</strong> {{ started }}</p>
<p><strong>Ended:</strong> {{ ended }}</p>
<p><strong>Duration:</strong> {{ duration }}</p>
"#;

const CRITICAL_ALERT_TEMPLATE: &str = r#"<h1>Critical incident detected</h1>
<p><strong>Title:</strong> {{ title }}</p>
<p><strong>Description:</strong> {{ description }}</p>
<p><strong>Platform:</strong> {{ platform }}</p>
<p><strong>Responsible team:</strong> {{ responsible_team }}</p>
<p><strong>Created:</strong> {{ created_at }}</p>
<p style="color: red;"><strong>Immediate action required.</strong></p>
"#;

const REMINDER_TEMPLATE: &str = r#"<h1>Incident update reminder</h1>
<p>Hello,</p>
<p>We are still waiting for the following information about incident "{{ title }}":</p>
<ul>
{% if missing_root_cause %}  <li>Root cause</li>
{% endif %}{% if missing_solution %}  <li>Solution provided</li>
{% endif %}</ul>
<p>This is the {{ ordinal }} reminder.</p>
<p><a href="{{ update_url | safe }}">Update the incident</a></p>
<p>Thank you.</p>
"#;

/// Renders e-mail bodies from the built-in templates
pub struct EmailTemplates {
    tera: Tera,
}

impl EmailTemplates {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (NEW_INCIDENT, NEW_INCIDENT_TEMPLATE),
            (CRITICAL_ALERT, CRITICAL_ALERT_TEMPLATE),
            (REMINDER, REMINDER_TEMPLATE),
        ])?;
        Ok(Self { tera })
    }

    pub fn new_incident(&self, incident: &Incident) -> Result<String> {
        let mut context = Self::base_context(incident);
        context.insert(
            "impacted_business",
            incident.impacted_business.as_deref().unwrap_or("-"),
        );
        context.insert("priority", incident.priority.as_str());
        context.insert("status", incident.status.as_str());
        context.insert("started", &format_time(incident.incident_start_time, "-"));
        context.insert(
            "ended",
            &format_time(incident.incident_end_time, "in progress"),
        );
        let duration = incident
            .duration
            .clone()
            .unwrap_or_else(|| IncidentDuration::for_incident(incident).to_string());
        context.insert("duration", &duration);

        Ok(self.tera.render(NEW_INCIDENT, &context)?)
    }

    pub fn critical_alert(&self, incident: &Incident) -> Result<String> {
        let mut context = Self::base_context(incident);
        context.insert(
            "created_at",
            &incident.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        );
        Ok(self.tera.render(CRITICAL_ALERT, &context)?)
    }

    /// Reminder body; `ordinal` counts from one
    pub fn reminder(&self, incident: &Incident, ordinal: u32, update_url: &str) -> Result<String> {
        let mut context = Self::base_context(incident);
        context.insert("missing_root_cause", &is_blank(&incident.root_cause));
        context.insert("missing_solution", &is_blank(&incident.solution_provided));
        context.insert("ordinal", &ordinal_suffix(ordinal));
        context.insert("update_url", update_url);
        Ok(self.tera.render(REMINDER, &context)?)
    }

    fn base_context(incident: &Incident) -> Context {
        let mut context = Context::new();
        context.insert("title", &incident.title);
        context.insert("ticket_number", &incident.ticket_number);
        context.insert("description", &incident.description);
        context.insert("platform", &incident.platform);
        context.insert("responsible_team", &incident.responsible_team);
        context
    }
}

fn format_time(at: Option<chrono::DateTime<chrono::Utc>>, missing: &str) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| missing.to_string())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

/// `1` -> `1st`, `12` -> `12th`, `23` -> `23rd`
pub fn ordinal_suffix(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
