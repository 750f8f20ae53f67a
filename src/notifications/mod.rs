//! Outgoing e-mail notifications
//!
//! Three messages exist: the new-incident report sent to RCA recipients, the
//! alert sent for every new P0, and the reminder for incidents still missing
//! their root cause or solution. Delivery goes through a [`Mailer`]; callers
//! dispatch in the background and never wait on it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::NotificationsConfig;
use crate::error::{Error, Result};
use crate::incidents::Incident;

pub mod mailer;
pub mod templates;

pub use mailer::{HttpMailer, LogMailer};
pub use templates::{ordinal_suffix, EmailTemplates};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Delivers a rendered message
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn deliver(&self, message: &EmailMessage) -> Result<()>;
}

/// Builds and sends incident e-mails
pub struct NotificationService {
    mailer: Arc<dyn Mailer>,
    templates: EmailTemplates,
    from: String,
    critical_recipient: Option<String>,
    public_app_url: String,
}

impl NotificationService {
    pub fn new(mailer: Arc<dyn Mailer>, config: &NotificationsConfig) -> Result<Self> {
        Ok(Self {
            mailer,
            templates: EmailTemplates::new()?,
            from: config.from.clone(),
            critical_recipient: config.critical_recipient.clone(),
            public_app_url: config.public_app_url.trim_end_matches('/').to_string(),
        })
    }

    /// Service for `config`, or `None` when notifications are disabled
    ///
    /// Without an endpoint, messages go to a [`LogMailer`].
    pub fn from_config(config: &NotificationsConfig) -> Result<Option<Arc<Self>>> {
        if !config.enabled {
            debug!("Notifications disabled");
            return Ok(None);
        }

        let mailer: Arc<dyn Mailer> = match &config.endpoint {
            Some(endpoint) => Arc::new(
                HttpMailer::new(endpoint.clone())?.with_auth_token(config.auth_token.clone()),
            ),
            None => {
                info!("No notification endpoint configured, e-mails will only be logged");
                Arc::new(LogMailer)
            }
        };
        Ok(Some(Arc::new(Self::new(mailer, config)?)))
    }

    pub fn update_url(&self, incident: &Incident) -> String {
        format!("{}/update-incident/{}", self.public_app_url, incident.id)
    }

    /// Report for the RCA recipients, copying the intervening person and team
    ///
    /// `None` when the incident has no RCA recipients.
    pub fn new_incident_message(&self, incident: &Incident) -> Result<Option<EmailMessage>> {
        if incident.rca_recipients.is_empty() {
            return Ok(None);
        }

        let cc = [
            incident.intervening_person_email.as_deref(),
            incident.responsible_team_email.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|email| !email.trim().is_empty())
        .map(str::to_string)
        .collect();

        Ok(Some(EmailMessage {
            from: self.from.clone(),
            to: incident.rca_recipients.clone(),
            cc,
            subject: format!(
                "New incident: {} - {}",
                incident.ticket_number, incident.title
            ),
            html: self.templates.new_incident(incident)?,
        }))
    }

    /// Alert for the configured critical recipient; `None` unless the incident is P0
    pub fn critical_alert_message(&self, incident: &Incident) -> Result<Option<EmailMessage>> {
        if !incident.priority.is_critical() {
            return Ok(None);
        }
        let Some(recipient) = &self.critical_recipient else {
            warn!(
                "P0 incident {} created but no critical recipient is configured",
                incident.ticket_number
            );
            return Ok(None);
        };

        Ok(Some(EmailMessage {
            from: self.from.clone(),
            to: vec![recipient.clone()],
            cc: Vec::new(),
            subject: format!("CRITICAL: new P0 incident - {}", incident.title),
            html: self.templates.critical_alert(incident)?,
        }))
    }

    /// Reminder naming the `ordinal`-th request for the missing analysis
    pub fn reminder_message(
        &self,
        incident: &Incident,
        to: &str,
        ordinal: u32,
    ) -> Result<EmailMessage> {
        Ok(EmailMessage {
            from: self.from.clone(),
            to: vec![to.to_string()],
            cc: Vec::new(),
            subject: format!(
                "Reminder: update required for incident - {}",
                incident.title
            ),
            html: self
                .templates
                .reminder(incident, ordinal, &self.update_url(incident))?,
        })
    }

    /// Send every message due for a freshly created incident
    ///
    /// Each message is delivered on its own: a failed report does not hold
    /// back the P0 alert. Returns how many messages were delivered, or the
    /// first failure once every message has been attempted.
    pub async fn incident_created(&self, incident: &Incident) -> Result<usize> {
        let mut first_error = None;
        let mut messages = Vec::new();
        for built in [
            self.new_incident_message(incident),
            self.critical_alert_message(incident),
        ] {
            match built {
                Ok(Some(message)) => messages.push(message),
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to render e-mail for {}: {}", incident.ticket_number, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        let mut sent = 0;
        for message in &messages {
            match self.mailer.deliver(message).await {
                Ok(()) => {
                    debug!("Sent '{}'", message.subject);
                    sent += 1;
                }
                Err(e) => {
                    warn!("Failed to send '{}': {}", message.subject, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(sent),
        }
    }

    /// Send the next reminder for `incident` to `to`
    ///
    /// The ordinal is derived from the incident's `reminder_count`.
    pub async fn send_reminder(&self, incident: &Incident, to: &str) -> Result<()> {
        if !incident.is_missing_analysis() {
            return Err(Error::Validation(format!(
                "incident {} already has a root cause and solution",
                incident.ticket_number
            )));
        }
        let message = self.reminder_message(incident, to, incident.reminder_count + 1)?;
        self.mailer.deliver(&message).await?;
        info!(
            "Sent reminder #{} for {} to {}",
            incident.reminder_count + 1,
            incident.ticket_number,
            to
        );
        Ok(())
    }

    /// Fire-and-forget variant of [`incident_created`](Self::incident_created)
    pub fn dispatch_created(self: &Arc<Self>, incident: Incident) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            match service.incident_created(&incident).await {
                Ok(sent) => debug!("Dispatched {} e-mail(s) for {}", sent, incident.ticket_number),
                Err(e) => warn!(
                    "Failed to send notifications for {}: {}",
                    incident.ticket_number, e
                ),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incidents::Priority;
    use crate::testing::fixtures::{IncidentBuilder, RecordingMailer};

    /// Rejects messages whose subject starts with `prefix`, records the rest
    struct FailingMailer {
        prefix: &'static str,
        inner: RecordingMailer,
    }

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn deliver(&self, message: &EmailMessage) -> Result<()> {
            if message.subject.starts_with(self.prefix) {
                return Err(Error::Network("relay unavailable".into()));
            }
            self.inner.deliver(message).await
        }
    }

    fn config() -> NotificationsConfig {
        NotificationsConfig {
            enabled: true,
            endpoint: None,
            auth_token: None,
            from: "incidents@example.com".into(),
            critical_recipient: Some("oncall@example.com".into()),
            public_app_url: "https://incidents.example.com/".into(),
        }
    }

    fn service(mailer: &RecordingMailer) -> NotificationService {
        NotificationService::new(Arc::new(mailer.clone()), &config()).unwrap()
    }

    #[tokio::test]
    async fn test_new_incident_goes_to_rca_with_cc() {
        let mailer = RecordingMailer::new();
        let incident = IncidentBuilder::new("a")
            .ticket("INC-2024-12345")
            .title("Disk full")
            .contacts("jane@example.com", "ops@example.com", &["rca@example.com"])
            .build();

        let sent = service(&mailer).incident_created(&incident).await.unwrap();
        assert_eq!(sent, 1);

        let messages = mailer.sent();
        assert_eq!(messages[0].to, vec!["rca@example.com"]);
        assert_eq!(messages[0].cc, vec!["jane@example.com", "ops@example.com"]);
        assert_eq!(messages[0].subject, "New incident: INC-2024-12345 - Disk full");
    }

    #[tokio::test]
    async fn test_p0_also_alerts_critical_recipient() {
        let mailer = RecordingMailer::new();
        let incident = IncidentBuilder::new("a")
            .priority(Priority::P0)
            .title("Checkout down")
            .contacts("jane@example.com", "ops@example.com", &["rca@example.com"])
            .build();

        assert_eq!(service(&mailer).incident_created(&incident).await.unwrap(), 2);
        let alert = &mailer.sent()[1];
        assert_eq!(alert.to, vec!["oncall@example.com"]);
        assert_eq!(alert.subject, "CRITICAL: new P0 incident - Checkout down");
    }

    #[tokio::test]
    async fn test_failed_report_does_not_block_p0_alert() {
        let recorded = RecordingMailer::new();
        let mailer = FailingMailer {
            prefix: "New incident",
            inner: recorded.clone(),
        };
        let service = NotificationService::new(Arc::new(mailer), &config()).unwrap();
        let incident = IncidentBuilder::new("a")
            .priority(Priority::P0)
            .title("Checkout down")
            .contacts("jane@example.com", "ops@example.com", &["rca@example.com"])
            .build();

        let err = service.incident_created(&incident).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));

        let sent = recorded.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["oncall@example.com"]);
        assert_eq!(sent[0].subject, "CRITICAL: new P0 incident - Checkout down");
    }

    #[tokio::test]
    async fn test_non_critical_without_recipients_sends_nothing() {
        let mailer = RecordingMailer::new();
        let incident = IncidentBuilder::new("a").priority(Priority::P1).build();
        assert_eq!(service(&mailer).incident_created(&incident).await.unwrap(), 0);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_reminder_uses_next_ordinal_and_update_link() {
        let mailer = RecordingMailer::new();
        let mut incident = IncidentBuilder::new("abc").build();
        incident.reminder_count = 2;

        service(&mailer)
            .send_reminder(&incident, "jane@example.com")
            .await
            .unwrap();

        let message = &mailer.sent()[0];
        assert_eq!(message.to, vec!["jane@example.com"]);
        assert!(message.html.contains("3rd reminder"));
        assert!(message
            .html
            .contains("https://incidents.example.com/update-incident/abc"));
    }

    #[tokio::test]
    async fn test_reminder_rejected_when_analysis_complete() {
        let mailer = RecordingMailer::new();
        let mut incident = IncidentBuilder::new("a").build();
        incident.root_cause = Some("bad deploy".into());
        incident.solution_provided = Some("rolled back".into());

        let err = service(&mailer)
            .send_reminder(&incident, "jane@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_runs_in_background() {
        let mailer = RecordingMailer::new();
        let service = Arc::new(service(&mailer));
        let incident = IncidentBuilder::new("a")
            .contacts("jane@example.com", "ops@example.com", &["rca@example.com"])
            .build();

        service.dispatch_created(incident).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }

    #[test]
    fn test_disabled_config_yields_no_service() {
        let disabled = NotificationsConfig::default();
        assert!(NotificationService::from_config(&disabled).unwrap().is_none());
    }
}
