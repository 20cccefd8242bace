//! SQLite-backed tracking store.
//!
//! Raw SQL with rusqlite, no ORM. The transcript is a JSON column holding
//! the normalized segment array. Each async operation opens its own
//! connection inside `spawn_blocking`; writes are partitioned by session
//! id, so no cross-connection coordination is needed.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

use crate::normalizer::TranscriptSegment;

use super::{TrackingRecord, TrackingStatus, TrackingStore, TrackingUpdate};

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tracking_records (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            transcript TEXT,
            failure_reason TEXT,
            event_id TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create tracking_records table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tracking_event_id ON tracking_records(event_id)",
        [],
    )
    .context("Failed to create tracking event_id index")?;

    Ok(())
}

/// Repository of row-level operations. Status mapping lives here so the
/// async wrapper stays a thin dispatch layer.
pub struct TrackingRepository;

impl TrackingRepository {
    pub fn insert(
        conn: &Connection,
        id: &str,
        status: TrackingStatus,
        event_id: Option<&str>,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO tracking_records (id, status, event_id) VALUES (?1, ?2, ?3)",
            params![id, status.as_str(), event_id],
        )
        .context("Failed to insert tracking record")?;
        Ok(())
    }

    pub fn update_fields(conn: &Connection, id: &str, update: &TrackingUpdate) -> Result<()> {
        let mut assignments: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = update.status {
            assignments.push("status = ?");
            values.push(Box::new(status.as_str().to_string()));
        }
        if let Some(transcript) = &update.transcript {
            assignments.push("transcript = ?");
            values.push(Box::new(
                serde_json::to_string(transcript).context("Failed to serialize transcript")?,
            ));
        }
        if let Some(reason) = &update.failure_reason {
            assignments.push("failure_reason = ?");
            values.push(Box::new(reason.clone()));
        }

        if assignments.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "UPDATE tracking_records SET {} WHERE id = ?",
            assignments.join(", ")
        );
        values.push(Box::new(id.to_string()));

        let value_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        conn.execute(&sql, value_refs.as_slice())
            .context("Failed to update tracking record")?;
        Ok(())
    }

    pub fn find(conn: &Connection, id: &str) -> Result<Option<TrackingRecord>> {
        conn.query_row(
            "SELECT id, status, transcript, failure_reason, event_id, created_at \
             FROM tracking_records WHERE id = ?1",
            params![id],
            Self::map_row,
        )
        .optional()
        .context("Failed to query tracking record")?
        .transpose()
    }

    pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
        let deleted = conn
            .execute("DELETE FROM tracking_records WHERE id = ?1", params![id])
            .context("Failed to delete tracking record")?;
        Ok(deleted > 0)
    }

    pub fn delete_by_event(conn: &Connection, event_id: &str) -> Result<usize> {
        conn.execute(
            "DELETE FROM tracking_records WHERE event_id = ?1",
            params![event_id],
        )
        .context("Failed to delete tracking records for event")
    }

    pub fn list_all(conn: &Connection) -> Result<Vec<TrackingRecord>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, status, transcript, failure_reason, event_id, created_at \
                 FROM tracking_records ORDER BY created_at DESC, id DESC",
            )
            .context("Failed to prepare tracking list query")?;

        let rows = stmt
            .query_map([], Self::map_row)
            .context("Failed to list tracking records")?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<TrackingRecord>> {
        let id: String = row.get(0)?;
        let status: String = row.get(1)?;
        let transcript: Option<String> = row.get(2)?;
        let failure_reason: Option<String> = row.get(3)?;
        let event_id: Option<String> = row.get(4)?;
        let created_at: String = row.get(5)?;

        Ok(Self::build_record(
            id,
            status,
            transcript,
            failure_reason,
            event_id,
            created_at,
        ))
    }

    fn build_record(
        id: String,
        status: String,
        transcript: Option<String>,
        failure_reason: Option<String>,
        event_id: Option<String>,
        created_at: String,
    ) -> Result<TrackingRecord> {
        let status = TrackingStatus::from_str(&status)?;
        let transcript = transcript
            .map(|json| {
                serde_json::from_str::<Vec<TranscriptSegment>>(&json)
                    .context("Failed to decode stored transcript")
            })
            .transpose()?;

        Ok(TrackingRecord {
            id,
            status,
            transcript,
            failure_reason,
            event_id,
            created_at,
        })
    }
}

/// Store handle holding the database path. Connections are opened per
/// operation, matching how request handlers use the database elsewhere.
#[derive(Clone)]
pub struct SqliteTrackingStore {
    db_path: PathBuf,
}

impl SqliteTrackingStore {
    /// Open (and migrate) the database at the default location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::global::db_file()?)
    }

    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&db_path).context("Failed to open database connection")?;
        migrate(&conn)?;

        Ok(Self { db_path })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn =
                Connection::open(&db_path).context("Failed to open database connection")?;
            op(&conn)
        })
        .await
        .context("Database task panicked")?
    }
}

#[async_trait]
impl TrackingStore for SqliteTrackingStore {
    async fn insert(
        &self,
        id: &str,
        status: TrackingStatus,
        event_id: Option<&str>,
    ) -> Result<()> {
        let id = id.to_string();
        let event_id = event_id.map(|e| e.to_string());
        self.with_conn(move |conn| {
            TrackingRepository::insert(conn, &id, status, event_id.as_deref())
        })
        .await
    }

    async fn update_fields(&self, id: &str, update: TrackingUpdate) -> Result<()> {
        let id = id.to_string();
        self.with_conn(move |conn| TrackingRepository::update_fields(conn, &id, &update))
            .await
    }

    async fn find(&self, id: &str) -> Result<Option<TrackingRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| TrackingRepository::find(conn, &id))
            .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| TrackingRepository::delete(conn, &id))
            .await
    }

    async fn delete_by_event(&self, event_id: &str) -> Result<usize> {
        let event_id = event_id.to_string();
        self.with_conn(move |conn| TrackingRepository::delete_by_event(conn, &event_id))
            .await
    }

    async fn list_all(&self) -> Result<Vec<TrackingRecord>> {
        self.with_conn(TrackingRepository::list_all).await
    }
}
