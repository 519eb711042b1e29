//! Result store: batched, idempotent persistence of pipeline outputs.
//!
//! The store itself is an external collaborator behind the `ResultStore`
//! trait; `SqliteResultStore` is the reference implementation. All writes are
//! keyed upserts, `(batch_id, record_index)` for classifications and
//! `(batch_id, client)` for summaries, so redelivered batches overwrite
//! instead of duplicating.

pub mod sqlite;
pub mod writer;

pub use sqlite::SqliteResultStore;
pub use writer::ResultWriter;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ClassificationRecord, ClientSummary};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("result store database error: {0}")]
    Database(String),

    #[error("result store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Result of one batched write call.
///
/// `rejected` holds indices into the submitted slice that the store refused
/// (throttling-style partial rejection). An empty list means every item was
/// accepted.
#[derive(Debug, Clone, Default)]
pub struct WriteOutcome {
    pub rejected: Vec<usize>,
}

impl WriteOutcome {
    pub fn accepted() -> Self {
        Self::default()
    }
}

/// Batched upsert interface over the result store.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn write_classifications(
        &self,
        items: &[ClassificationRecord],
    ) -> Result<WriteOutcome, StoreError>;

    async fn write_summaries(&self, items: &[ClientSummary]) -> Result<WriteOutcome, StoreError>;
}
