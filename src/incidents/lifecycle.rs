//! Status transitions and partial updates for existing incidents

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::{Incident, Status};
use crate::error::{Error, Result};

/// Partial update applied to a stored incident
///
/// `None` leaves a field untouched. `resolved_at` is doubly optional so a patch
/// can clear an existing resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncidentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_provided: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_count: Option<u32>,
}

impl IncidentPatch {
    /// Patch moving `incident` to `target`, stamping or clearing the resolution time
    pub fn status_change(incident: &Incident, target: Status, now: DateTime<Utc>) -> Result<Self> {
        if target == Status::New {
            return Err(Error::InvalidTransition(format!(
                "incident {} cannot move back to {}",
                incident.ticket_label(),
                Status::New
            )));
        }
        if incident.status == target {
            return Err(Error::InvalidTransition(format!(
                "incident {} is already {}",
                incident.ticket_label(),
                target
            )));
        }

        let resolved_at = (target == Status::Resolved).then_some(now);
        Ok(Self {
            status: Some(target),
            resolved_at: Some(resolved_at),
            ..Default::default()
        })
    }

    pub fn root_cause(text: impl Into<String>) -> Self {
        Self {
            root_cause: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn solution(text: impl Into<String>) -> Self {
        Self {
            solution_provided: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the patch in place
    pub fn apply(&self, incident: &mut Incident) {
        if let Some(status) = self.status {
            incident.status = status;
        }
        if let Some(resolved_at) = self.resolved_at {
            incident.resolved_at = resolved_at;
        }
        if let Some(root_cause) = &self.root_cause {
            incident.root_cause = Some(root_cause.clone());
        }
        if let Some(solution) = &self.solution_provided {
            incident.solution_provided = Some(solution.clone());
        }
        if let Some(location) = &self.location {
            incident.location = Some(location.clone());
        }
        if let Some(count) = self.reminder_count {
            incident.reminder_count = count;
        }
    }

    /// Check that a record returned by a store reflects this patch
    pub fn verify_applied(&self, incident: &Incident) -> Result<()> {
        let mismatch = |field: &str| {
            Err(Error::UpdateNotApplied(format!(
                "{} was not updated on incident {}",
                field, incident.id
            )))
        };

        if self.status.is_some_and(|s| s != incident.status) {
            return mismatch("status");
        }
        if self
            .root_cause
            .as_ref()
            .is_some_and(|rc| incident.root_cause.as_ref() != Some(rc))
        {
            return mismatch("root_cause");
        }
        if self
            .solution_provided
            .as_ref()
            .is_some_and(|s| incident.solution_provided.as_ref() != Some(s))
        {
            return mismatch("solution_provided");
        }
        Ok(())
    }
}

impl Incident {
    /// Ticket number when known, id otherwise
    pub fn ticket_label(&self) -> &str {
        if self.ticket_number.is_empty() {
            &self.id
        } else {
            &self.ticket_number
        }
    }
}
