//! Incident persistence
//!
//! Every backend exposes the same [`IncidentStore`] surface: a full list, point
//! reads, creation from a draft, partial updates, a health ping, and a change
//! feed telling subscribers to re-list.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::{Error, Result};
use crate::incidents::{Incident, IncidentDraft, IncidentPatch};

pub mod json_file;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use json_file::JsonFileIncidentStore;
pub use memory::MemoryIncidentStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteIncidentStore;

/// Buffered change events per subscriber before it starts lagging
pub const CHANGE_FEED_CAPACITY: usize = 64;

/// Signal that the incident collection changed and should be re-listed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ChangeEvent {
    Created(String),
    Updated(String),
    /// The backing data changed outside this process
    Reloaded,
}

#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// All incidents, newest first
    async fn list(&self) -> Result<Vec<Incident>>;

    async fn get(&self, id: &str) -> Result<Incident>;

    /// Validate and persist a draft as a `NEW` incident
    async fn create(&self, draft: IncidentDraft) -> Result<Incident>;

    /// Apply `patch` and return the stored record
    async fn update(&self, id: &str, patch: IncidentPatch) -> Result<Incident>;

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;

    /// Check that the backend is reachable
    async fn ping(&self) -> Result<()>;
}

/// Open the backend selected by `config`
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn IncidentStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryIncidentStore::new())),
        StoreBackend::Json => {
            let path = config.path.as_ref().ok_or_else(|| {
                Error::Config("store.path is required for the json backend".to_string())
            })?;
            let store = JsonFileIncidentStore::open(path).await?;
            store.watch()?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => {
            let path = config.path.as_ref().ok_or_else(|| {
                Error::Config("store.path is required for the sqlite backend".to_string())
            })?;
            Ok(Arc::new(SqliteIncidentStore::open(path).await?))
        }
        #[cfg(not(feature = "sqlite"))]
        StoreBackend::Sqlite => Err(Error::Config(
            "SQLite support is not compiled in; rebuild with --features sqlite".to_string(),
        )),
    }
}

/// Order records newest first, keeping insertion order among equal timestamps
pub(crate) fn sort_newest_first(incidents: &mut [Incident]) {
    incidents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
