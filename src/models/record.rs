use serde::{Deserialize, Serialize};

/// One visit note extracted from a batch payload.
///
/// Immutable once extracted; `record_index` is the note's 0-based position
/// within its batch and, together with `batch_id`, identifies the record
/// everywhere downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitRecord {
    pub batch_id: String,
    pub record_index: usize,
    pub client: String,
    pub care_pro: String,
    pub visit_date: String,
    pub note: String,
}
