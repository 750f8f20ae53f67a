use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::{sort_newest_first, ChangeEvent, IncidentStore, CHANGE_FEED_CAPACITY};
use crate::error::{Error, Result};
use crate::incidents::{generate_ticket_number, Incident, IncidentDraft, IncidentPatch};

/// Process-local store, mainly for tests and demos
pub struct MemoryIncidentStore {
    incidents: RwLock<Vec<Incident>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl Default for MemoryIncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIncidentStore {
    pub fn new() -> Self {
        Self::with_incidents(Vec::new())
    }

    /// Store pre-populated with `incidents`
    pub fn with_incidents(incidents: Vec<Incident>) -> Self {
        let (events, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            incidents: RwLock::new(incidents),
            events,
        }
    }

    /// Replace every record and notify subscribers
    pub async fn replace_all(&self, incidents: Vec<Incident>) {
        *self.incidents.write().await = incidents;
        let _ = self.events.send(ChangeEvent::Reloaded);
    }
}

#[async_trait]
impl IncidentStore for MemoryIncidentStore {
    async fn list(&self) -> Result<Vec<Incident>> {
        let mut incidents = self.incidents.read().await.clone();
        sort_newest_first(&mut incidents);
        Ok(incidents)
    }

    async fn get(&self, id: &str) -> Result<Incident> {
        find(&self.incidents.read().await, id).cloned()
    }

    async fn create(&self, draft: IncidentDraft) -> Result<Incident> {
        let incident = {
            let mut incidents = self.incidents.write().await;
            insert_draft(&mut incidents, draft, Utc::now())?
        };
        let _ = self.events.send(ChangeEvent::Created(incident.id.clone()));
        Ok(incident)
    }

    async fn update(&self, id: &str, patch: IncidentPatch) -> Result<Incident> {
        let incident = {
            let mut incidents = self.incidents.write().await;
            apply_patch(&mut incidents, id, &patch)?
        };
        let _ = self.events.send(ChangeEvent::Updated(incident.id.clone()));
        Ok(incident)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn find<'a>(incidents: &'a [Incident], id: &str) -> Result<&'a Incident> {
    incidents
        .iter()
        .find(|i| i.id == id)
        .ok_or_else(|| Error::NotFound(id.to_string()))
}

/// Turn `draft` into a record and append it, rejecting duplicate ticket numbers
pub(crate) fn insert_draft(
    incidents: &mut Vec<Incident>,
    mut draft: IncidentDraft,
    now: DateTime<Utc>,
) -> Result<Incident> {
    if draft.ticket_number.is_none() {
        let mut ticket = generate_ticket_number(now);
        while incidents.iter().any(|i| i.ticket_number == ticket) {
            ticket = generate_ticket_number(now);
        }
        draft.ticket_number = Some(ticket);
    }
    let incident = draft.into_incident(Uuid::new_v4().to_string(), now)?;
    if incidents
        .iter()
        .any(|i| i.ticket_number == incident.ticket_number)
    {
        return Err(Error::Conflict(format!(
            "ticket number {} already exists",
            incident.ticket_number
        )));
    }

    debug!("Created incident {} ({})", incident.ticket_number, incident.id);
    incidents.push(incident.clone());
    Ok(incident)
}

pub(crate) fn apply_patch(
    incidents: &mut [Incident],
    id: &str,
    patch: &IncidentPatch,
) -> Result<Incident> {
    let incident = incidents
        .iter_mut()
        .find(|i| i.id == id)
        .ok_or_else(|| Error::NotFound(id.to_string()))?;
    patch.apply(incident);
    debug!("Updated incident {}", incident.ticket_label());
    Ok(incident.clone())
}
