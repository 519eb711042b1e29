//! SQLite-backed result store.
//!
//! Rows are written with `INSERT OR REPLACE` on the idempotency key, so
//! re-running a batch (at-least-once trigger delivery) updates rows in place.
//! This store accepts whole chunks atomically and never partially rejects.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection};

use super::{ResultStore, StoreError, WriteOutcome};
use crate::config::PipelineConfig;
use crate::models::{ClassificationRecord, ClientSummary};

pub struct SqliteResultStore {
    conn: Mutex<Connection>,
    classification_table: String,
    summary_table: String,
}

impl SqliteResultStore {
    /// Open (or create) the store at `path` and ensure both tables exist.
    pub fn open(path: &Path, config: &PipelineConfig) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, config)
    }

    /// In-memory store, used by tests and local dry runs.
    pub fn in_memory(config: &PipelineConfig) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, config)
    }

    fn with_connection(conn: Connection, config: &PipelineConfig) -> Result<Self, StoreError> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                     batch_id TEXT NOT NULL,
                     record_index INTEGER NOT NULL,
                     ai_classification TEXT NOT NULL,
                     client TEXT NOT NULL,
                     care_pro TEXT NOT NULL,
                     visit_date TEXT NOT NULL,
                     note TEXT NOT NULL,
                     fallback INTEGER NOT NULL,
                     timestamp TEXT NOT NULL,
                     PRIMARY KEY (batch_id, record_index)
                 )",
                config.classification_table
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                     batch_id TEXT NOT NULL,
                     client TEXT NOT NULL,
                     summary TEXT NOT NULL,
                     source_record_count INTEGER NOT NULL,
                     latest_visit_date TEXT NOT NULL,
                     timestamp TEXT NOT NULL,
                     PRIMARY KEY (batch_id, client)
                 )",
                config.summary_table
            ),
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            classification_table: config.classification_table.clone(),
            summary_table: config.summary_table.clone(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    /// Number of classification rows stored for a batch.
    pub fn classification_count(&self, batch_id: &str) -> Result<u32, StoreError> {
        let conn = self.lock()?;
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE batch_id = ?1",
                self.classification_table
            ),
            params![batch_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Number of summary rows stored for a batch.
    pub fn summary_count(&self, batch_id: &str) -> Result<u32, StoreError> {
        let conn = self.lock()?;
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE batch_id = ?1",
                self.summary_table
            ),
            params![batch_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn write_classifications(
        &self,
        items: &[ClassificationRecord],
    ) -> Result<WriteOutcome, StoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for item in items {
            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO {}
                     (batch_id, record_index, ai_classification, client, care_pro,
                      visit_date, note, fallback, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    self.classification_table
                ),
                params![
                    item.batch_id,
                    item.record_index as i64,
                    item.ai_classification.as_str(),
                    item.client,
                    item.care_pro,
                    item.visit_date,
                    item.note,
                    item.fallback,
                    item.timestamp,
                ],
            )?;
        }
        tx.commit()?;
        Ok(WriteOutcome::accepted())
    }

    async fn write_summaries(&self, items: &[ClientSummary]) -> Result<WriteOutcome, StoreError> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for item in items {
            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO {}
                     (batch_id, client, summary, source_record_count,
                      latest_visit_date, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    self.summary_table
                ),
                params![
                    item.batch_id,
                    item.client,
                    item.summary,
                    item.source_record_count as i64,
                    item.latest_visit_date,
                    item.timestamp,
                ],
            )?;
        }
        tx.commit()?;
        Ok(WriteOutcome::accepted())
    }
}
