//! SQLite-backed incident store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};
use std::path::Path;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::{ChangeEvent, IncidentStore, CHANGE_FEED_CAPACITY};
use crate::error::{Error, Result};
use crate::incidents::{generate_ticket_number, Incident, IncidentDraft, IncidentPatch};

/// Incidents stored one row each, with the full record kept as JSON
pub struct SqliteIncidentStore {
    pool: SqlitePool,
    events: broadcast::Sender<ChangeEvent>,
}

impl SqliteIncidentStore {
    pub async fn open(database_path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = database_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let database_url = format!("sqlite://{}?mode=rwc", database_path.as_ref().display());
        let pool = SqlitePool::connect(&database_url).await.map_err(|e| {
            Error::Storage(format!(
                "Failed to connect to incident database at {}: {e}",
                database_path.as_ref().display()
            ))
        })?;

        let (events, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        let store = Self { pool, events };
        store.initialize_schema().await?;

        info!(
            "Incident database initialized at {}",
            database_path.as_ref().display()
        );
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS incidents (
                id TEXT PRIMARY KEY,
                ticket_number TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                platform TEXT NOT NULL,
                intervening_team TEXT NOT NULL,
                created_at TEXT NOT NULL,
                resolved_at TEXT,
                record TEXT NOT NULL,
                updated_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_incidents_created_at ON incidents(created_at);
            CREATE INDEX IF NOT EXISTS idx_incidents_platform ON incidents(platform);
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("Database schema initialized");
        Ok(())
    }

    async fn write_row(&self, incident: &Incident, insert: bool) -> Result<()> {
        let record = serde_json::to_string(incident)?;
        let statement = if insert {
            r#"
            INSERT INTO incidents (
                status, priority, platform, intervening_team, resolved_at, record,
                created_at, ticket_number, id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        } else {
            r#"
            UPDATE incidents SET
                status = ?, priority = ?, platform = ?, intervening_team = ?,
                resolved_at = ?, record = ?, created_at = ?, ticket_number = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#
        };

        let result = sqlx::query(statement)
            .bind(incident.status.as_str())
            .bind(incident.priority.as_str())
            .bind(&incident.platform)
            .bind(&incident.intervening_team)
            .bind(incident.resolved_at.map(|dt| dt.to_rfc3339()))
            .bind(record)
            .bind(incident.created_at.to_rfc3339())
            .bind(&incident.ticket_number)
            .bind(&incident.id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(Error::Conflict(
                format!("ticket number {} already exists", incident.ticket_number),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn ticket_taken(&self, ticket: &str) -> Result<bool> {
        let existing = sqlx::query("SELECT id FROM incidents WHERE ticket_number = ?")
            .bind(ticket)
            .fetch_optional(&self.pool)
            .await?;
        Ok(existing.is_some())
    }
}

fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<Incident> {
    let record: String = row.get("record");
    Ok(serde_json::from_str(&record)?)
}

#[async_trait]
impl IncidentStore for SqliteIncidentStore {
    async fn list(&self) -> Result<Vec<Incident>> {
        let rows = sqlx::query("SELECT record FROM incidents ORDER BY created_at DESC, rowid ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_row).collect()
    }

    async fn get(&self, id: &str) -> Result<Incident> {
        let row = sqlx::query("SELECT record FROM incidents WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Err(Error::NotFound(id.to_string()));
        };
        decode_row(&row)
    }

    async fn create(&self, mut draft: IncidentDraft) -> Result<Incident> {
        let now = Utc::now();
        if draft.ticket_number.is_none() {
            let mut ticket = generate_ticket_number(now);
            while self.ticket_taken(&ticket).await? {
                ticket = generate_ticket_number(now);
            }
            draft.ticket_number = Some(ticket);
        }
        let incident = draft.into_incident(Uuid::new_v4().to_string(), now)?;

        if self.ticket_taken(&incident.ticket_number).await? {
            return Err(Error::Conflict(format!(
                "ticket number {} already exists",
                incident.ticket_number
            )));
        }

        self.write_row(&incident, true).await?;
        debug!("Incident {} persisted", incident.ticket_number);
        let _ = self.events.send(ChangeEvent::Created(incident.id.clone()));
        Ok(incident)
    }

    async fn update(&self, id: &str, patch: IncidentPatch) -> Result<Incident> {
        let mut incident = self.get(id).await?;
        patch.apply(&mut incident);
        self.write_row(&incident, false).await?;

        let _ = self.events.send(ChangeEvent::Updated(incident.id.clone()));
        Ok(incident)
    }

    fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
