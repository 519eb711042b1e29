use serde::{Deserialize, Serialize};

/// Persisted narrative summary of one client's notes within a batch.
///
/// Keyed by `(batch_id, client)` in the result store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSummary {
    pub batch_id: String,
    pub client: String,
    pub summary: String,
    /// How many visit records fed this summary.
    pub source_record_count: usize,
    /// Most recent visit date in the group.
    pub latest_visit_date: String,
    /// Processing time, ISO 8601.
    pub timestamp: String,
}
