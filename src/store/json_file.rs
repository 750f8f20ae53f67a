use async_trait::async_trait;
use chrono::Utc;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info, warn};

use super::memory::{apply_patch, find, insert_draft};
use super::{sort_newest_first, ChangeEvent, IncidentStore, CHANGE_FEED_CAPACITY};
use crate::error::{Error, Result};
use crate::incidents::{decode_incidents, Incident, IncidentDraft, IncidentPatch};

/// Incidents kept in a single JSON array file
///
/// Writes replace the file atomically. With [`watch`](Self::watch) enabled,
/// edits made by other processes are picked up and announced as
/// [`ChangeEvent::Reloaded`].
pub struct JsonFileIncidentStore {
    shared: Arc<Shared>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

struct Shared {
    path: PathBuf,
    incidents: RwLock<Vec<Incident>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl JsonFileIncidentStore {
    /// Open `path`, starting empty when the file does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let incidents = read_file(&path).await?;
        info!(
            "Opened incident file {} ({} records)",
            path.display(),
            incidents.len()
        );

        let (events, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Ok(Self {
            shared: Arc::new(Shared {
                path,
                incidents: RwLock::new(incidents),
                events,
            }),
            watcher: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Re-read the file, notifying subscribers if its content changed
    ///
    /// Returns whether anything changed.
    pub async fn reload(&self) -> Result<bool> {
        self.shared.reload().await
    }

    /// Watch the file for external edits until the store is dropped
    pub fn watch(&self) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<()>(16);
        let file_name = self.shared.path.file_name().map(|n| n.to_os_string());

        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
                        && event
                            .paths
                            .iter()
                            .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name)
                    {
                        // A full queue already holds a pending reload.
                        let _ = tx.try_send(());
                    }
                }
            })?;

        let dir = self
            .shared
            .path
            .parent()
            .ok_or_else(|| Error::Storage("incident file has no parent directory".to_string()))?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                if let Err(e) = shared.reload().await {
                    warn!("Failed to reload {}: {}", shared.path.display(), e);
                }
            }
            debug!("Stopped watching {}", shared.path.display());
        });

        let mut slot = self
            .watcher
            .lock()
            .map_err(|_| Error::Storage("watcher lock poisoned".to_string()))?;
        *slot = Some(watcher);
        info!("Watching {} for external changes", self.shared.path.display());
        Ok(())
    }
}

impl Shared {
    async fn reload(&self) -> Result<bool> {
        let fresh = read_file(&self.path).await?;
        let mut incidents = self.incidents.write().await;
        if *incidents == fresh {
            return Ok(false);
        }
        *incidents = fresh;
        drop(incidents);

        debug!("Reloaded {}", self.path.display());
        let _ = self.events.send(ChangeEvent::Reloaded);
        Ok(true)
    }

    async fn persist(&self, incidents: &[Incident]) -> Result<()> {
        let json = serde_json::to_string_pretty(incidents)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

async fn read_file(path: &Path) -> Result<Vec<Incident>> {
    match fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
        Ok(content) => decode_incidents(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl IncidentStore for JsonFileIncidentStore {
    async fn list(&self) -> Result<Vec<Incident>> {
        let mut incidents = self.shared.incidents.read().await.clone();
        sort_newest_first(&mut incidents);
        Ok(incidents)
    }

    async fn get(&self, id: &str) -> Result<Incident> {
        find(&self.shared.incidents.read().await, id).cloned()
    }

    async fn create(&self, draft: IncidentDraft) -> Result<Incident> {
        let mut incidents = self.shared.incidents.write().await;
        let mut next = incidents.clone();
        let incident = insert_draft(&mut next, draft, Utc::now())?;
        self.shared.persist(&next).await?;
        *incidents = next;
        drop(incidents);

        let _ = self
            .shared
            .events
            .send(ChangeEvent::Created(incident.id.clone()));
        Ok(incident)
    }

    async fn update(&self, id: &str, patch: IncidentPatch) -> Result<Incident> {
        let mut incidents = self.shared.incidents.write().await;
        let mut next = incidents.clone();
        let incident = apply_patch(&mut next, id, &patch)?;
        self.shared.persist(&next).await?;
        *incidents = next;
        drop(incidents);

        let _ = self
            .shared
            .events
            .send(ChangeEvent::Updated(incident.id.clone()));
        Ok(incident)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.shared.events.subscribe()
    }

    async fn ping(&self) -> Result<()> {
        let dir = self.shared.path.parent().unwrap_or_else(|| Path::new("."));
        fs::metadata(dir)
            .await
            .map(|_| ())
            .map_err(|e| Error::Storage(format!("{} is not accessible: {e}", dir.display())))
    }
}
