//! Dashboard service
//!
//! Keeps the latest incident list and its statistics snapshot, recomputing
//! both whenever the store reports a change, and routes triage edits to the
//! store.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::analytics::{
    daily_trend, platforms, DashboardFilter, DurationSummary, IncidentStats, StatsAggregator,
    TrendPoint,
};
use crate::error::{Error, Result};
use crate::incidents::{Incident, IncidentDraft, IncidentPatch, Status};
use crate::notifications::NotificationService;
use crate::store::{ChangeEvent, IncidentStore};

#[derive(Debug, Clone, Default)]
struct Snapshot {
    generation: u64,
    incidents: Vec<Incident>,
    stats: IncidentStats,
    refreshed_at: Option<DateTime<Utc>>,
}

pub struct DashboardService {
    store: Arc<dyn IncidentStore>,
    notifier: Option<Arc<NotificationService>>,
    aggregator: StatsAggregator,
    generation: AtomicU64,
    snapshot: RwLock<Snapshot>,
    pending_notifications: Mutex<Vec<JoinHandle<()>>>,
}

impl DashboardService {
    pub fn new(store: Arc<dyn IncidentStore>, notifier: Option<Arc<NotificationService>>) -> Self {
        Self {
            store,
            notifier,
            aggregator: StatsAggregator::default(),
            generation: AtomicU64::new(0),
            snapshot: RwLock::new(Snapshot::default()),
            pending_notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn IncidentStore> {
        &self.store
    }

    /// Re-list and re-aggregate, replacing the current snapshot
    ///
    /// Refreshes that finish out of order never overwrite a snapshot taken
    /// by a refresh that started later.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<IncidentStats> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let incidents = self.store.list().await?;
        let stats = self.aggregator.aggregate(&incidents, now);

        let mut snapshot = self.snapshot.write().await;
        if generation > snapshot.generation {
            *snapshot = Snapshot {
                generation,
                incidents,
                stats: stats.clone(),
                refreshed_at: Some(now),
            };
            debug!("Dashboard snapshot #{} installed", generation);
        } else {
            debug!(
                "Discarding stale snapshot #{} (current #{})",
                generation, snapshot.generation
            );
        }
        Ok(stats)
    }

    /// Handler for store change events
    pub async fn on_data_changed(&self, event: &ChangeEvent) -> Result<()> {
        debug!("Data changed: {:?}", event);
        self.refresh(Utc::now()).await.map(|_| ())
    }

    /// Refresh on every store change until the feed closes
    pub fn spawn_change_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let mut events = self.store.subscribe();
        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Change feed lagged by {} events, refreshing", skipped);
                        ChangeEvent::Reloaded
                    }
                    Err(RecvError::Closed) => break,
                };
                if let Err(e) = service.on_data_changed(&event).await {
                    warn!("Failed to refresh dashboard: {}", e);
                }
            }
            info!("Change feed closed, dashboard listener stopped");
        })
    }

    pub async fn snapshot(&self) -> IncidentStats {
        self.snapshot.read().await.stats.clone()
    }

    /// Incidents from the latest snapshot, newest first
    pub async fn incidents(&self) -> Vec<Incident> {
        self.snapshot.read().await.incidents.clone()
    }

    pub async fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().await.refreshed_at
    }

    /// Statistics restricted to `filter`
    pub async fn filtered_stats(&self, filter: &DashboardFilter, now: DateTime<Utc>) -> IncidentStats {
        let snapshot = self.snapshot.read().await;
        if filter.is_unfiltered() {
            return snapshot.stats.clone();
        }
        let selected = filter.apply(&snapshot.incidents, now);
        self.aggregator.aggregate(&selected, now)
    }

    pub async fn trend(&self, filter: &DashboardFilter, now: DateTime<Utc>) -> Vec<TrendPoint> {
        let snapshot = self.snapshot.read().await;
        daily_trend(&filter.apply(&snapshot.incidents, now))
    }

    pub async fn platforms(&self) -> Vec<String> {
        platforms(&self.snapshot.read().await.incidents)
    }

    pub async fn incident(&self, id: &str) -> Result<Incident> {
        self.store.get(id).await
    }

    pub async fn duration(&self, id: &str, now: DateTime<Utc>) -> Result<DurationSummary> {
        let incident = self.store.get(id).await?;
        Ok(DurationSummary::for_incident(&incident, now))
    }

    /// Persist a new report and notify its recipients in the background
    pub async fn report_incident(&self, draft: IncidentDraft) -> Result<Incident> {
        let incident = self.store.create(draft).await?;
        info!(
            "Reported incident {} ({}, {})",
            incident.ticket_number, incident.priority, incident.platform
        );
        if let Some(notifier) = &self.notifier {
            let handle = notifier.dispatch_created(incident.clone());
            let mut pending = self.pending_notifications.lock().await;
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
        Ok(incident)
    }

    /// Wait for background notifications started so far
    pub async fn flush_notifications(&self) {
        let pending = std::mem::take(&mut *self.pending_notifications.lock().await);
        for handle in pending {
            if let Err(e) = handle.await {
                warn!("Notification task failed: {}", e);
            }
        }
    }

    pub async fn change_status(
        &self,
        id: &str,
        target: Status,
        now: DateTime<Utc>,
    ) -> Result<Incident> {
        let incident = self.store.get(id).await?;
        let patch = IncidentPatch::status_change(&incident, target, now)?;
        let updated = self.apply(id, patch).await?;
        info!(
            "Incident {} moved from {} to {}",
            updated.ticket_label(),
            incident.status,
            updated.status
        );
        Ok(updated)
    }

    pub async fn record_root_cause(&self, id: &str, text: &str) -> Result<Incident> {
        self.apply(id, IncidentPatch::root_cause(text)).await
    }

    pub async fn record_solution(&self, id: &str, text: &str) -> Result<Incident> {
        self.apply(id, IncidentPatch::solution(text)).await
    }

    /// E-mail `to` asking for the missing analysis and count the reminder
    pub async fn send_reminder(&self, id: &str, to: &str) -> Result<Incident> {
        let notifier = self
            .notifier
            .as_ref()
            .ok_or_else(|| Error::Notification("notifications are disabled".to_string()))?;

        let incident = self.store.get(id).await?;
        notifier.send_reminder(&incident, to).await?;

        let patch = IncidentPatch {
            reminder_count: Some(incident.reminder_count + 1),
            ..Default::default()
        };
        self.apply(id, patch).await
    }

    async fn apply(&self, id: &str, patch: IncidentPatch) -> Result<Incident> {
        let updated = self.store.update(id, patch.clone()).await?;
        patch.verify_applied(&updated)?;
        Ok(updated)
    }

    pub async fn health(&self) -> Result<()> {
        self.store.ping().await
    }
}
