//! Record extraction: raw batch payload → ordered `VisitRecord` sequence.
//!
//! The only batch-fatal condition lives here. A payload that is not a JSON
//! array fails the whole batch; anything wrong with an individual entry is
//! tolerated by defaulting its fields, so one bad record never sinks the
//! batch at this stage.

use serde::Deserialize;

use super::PipelineError;
use crate::models::VisitRecord;

/// Minimum plausible batch id length. Object keys like `x.json` are upload
/// mistakes, not batches.
const MIN_BATCH_ID_LEN: usize = 6;

/// Derive a batch id from a storage object key.
///
/// The final path segment minus its extension is the batch id
/// (`uploads/batch-2026-08-04.json` → `batch-2026-08-04`). Returns `None`
/// when the result is too short to be a plausible id.
pub fn batch_id_from_key(key: &str) -> Option<String> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) => stem,
        None => file_name,
    };
    if stem.len() >= MIN_BATCH_ID_LEN {
        Some(stem.to_string())
    } else {
        None
    }
}

/// One raw entry of the batch payload. Every field is optional on the wire;
/// missing values default to the empty string.
#[derive(Debug, Default, Deserialize)]
struct RawVisitRecord {
    #[serde(default)]
    note: String,
    #[serde(default)]
    client: String,
    #[serde(default)]
    care_pro: String,
    #[serde(default)]
    visit_date: String,
}

/// Parse a batch payload into ordered visit records.
///
/// Record indices are assigned from payload position and never change
/// afterwards; they are half of the idempotency key.
pub fn extract_records(batch_id: &str, payload: &str) -> Result<Vec<VisitRecord>, PipelineError> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| PipelineError::MalformedBatch(e.to_string()))?;

    let entries = value.as_array().ok_or_else(|| {
        PipelineError::MalformedBatch("payload is not a JSON array of note objects".to_string())
    })?;

    let records = entries
        .iter()
        .enumerate()
        .map(|(record_index, entry)| {
            let raw: RawVisitRecord = match serde_json::from_value(entry.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(
                        batch_id,
                        record_index,
                        error = %e,
                        "batch entry is not a note object, defaulting its fields"
                    );
                    RawVisitRecord::default()
                }
            };
            VisitRecord {
                batch_id: batch_id.to_string(),
                record_index,
                client: raw.client,
                care_pro: raw.care_pro,
                visit_date: raw.visit_date,
                note: raw.note,
            }
        })
        .collect();

    Ok(records)
}
