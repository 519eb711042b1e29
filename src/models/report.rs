//! Run-level reporting types.
//!
//! A `BatchOutcome` exists only for the duration of one pipeline invocation:
//! it is logged and handed back to the caller, never persisted. Its failure
//! list is the no-silent-data-loss guarantee: every record that could not be
//! classified, summarised or written appears here by index.

use serde::{Deserialize, Serialize};

/// What kind of failure a work unit (or its write) terminated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Classification,
    Summarization,
    Timeout,
    StoreWrite,
    /// A work unit panicked or the pool could not run it. Sibling units are
    /// unaffected.
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Summarization => "summarization",
            Self::Timeout => "timeout",
            Self::StoreWrite => "store_write",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One failed unit of work, by input index.
///
/// For classification runs the index is the record index; for summary runs it
/// is the client group's position in the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitFailure {
    pub index: usize,
    pub kind: FailureKind,
    pub message: String,
}

/// Terminal status of one pipeline invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
    AllSucceeded,
    PartialFailure { succeeded: usize, failed: usize },
    /// Extraction-level failure: the payload never yielded records.
    BatchFailed,
}

/// Run report for one batch invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub batch_id: String,
    pub total_records: usize,
    pub succeeded_count: usize,
    pub failed_count: usize,
    pub failures: Vec<UnitFailure>,
    pub duration_ms: u64,
    /// Set only when the batch failed before any record was produced.
    pub batch_error: Option<String>,
}

impl BatchOutcome {
    /// Report for a batch whose payload could not be extracted at all.
    pub fn failed(batch_id: &str, error: String, duration_ms: u64) -> Self {
        Self {
            batch_id: batch_id.to_string(),
            total_records: 0,
            succeeded_count: 0,
            failed_count: 0,
            failures: Vec::new(),
            duration_ms,
            batch_error: Some(error),
        }
    }

    pub fn status(&self) -> BatchStatus {
        if self.batch_error.is_some() {
            BatchStatus::BatchFailed
        } else if self.failed_count == 0 {
            BatchStatus::AllSucceeded
        } else {
            BatchStatus::PartialFailure {
                succeeded: self.succeeded_count,
                failed: self.failed_count,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_display() {
        assert_eq!(FailureKind::Timeout.to_string(), "timeout");
        assert_eq!(FailureKind::StoreWrite.to_string(), "store_write");
    }

    #[test]
    fn failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::StoreWrite).unwrap();
        assert_eq!(json, "\"store_write\"");
    }

    #[test]
    fn status_all_succeeded() {
        let outcome = BatchOutcome {
            batch_id: "b".to_string(),
            total_records: 3,
            succeeded_count: 3,
            failed_count: 0,
            failures: Vec::new(),
            duration_ms: 12,
            batch_error: None,
        };
        assert_eq!(outcome.status(), BatchStatus::AllSucceeded);
    }

    #[test]
    fn status_partial_failure_carries_counts() {
        let outcome = BatchOutcome {
            batch_id: "b".to_string(),
            total_records: 5,
            succeeded_count: 4,
            failed_count: 1,
            failures: vec![UnitFailure {
                index: 2,
                kind: FailureKind::Timeout,
                message: "deadline".to_string(),
            }],
            duration_ms: 12,
            batch_error: None,
        };
        assert_eq!(
            outcome.status(),
            BatchStatus::PartialFailure {
                succeeded: 4,
                failed: 1
            }
        );
    }

    #[test]
    fn status_batch_failed_wins() {
        let outcome = BatchOutcome::failed("b", "not a JSON array".to_string(), 3);
        assert_eq!(outcome.status(), BatchStatus::BatchFailed);
        assert_eq!(outcome.total_records, 0);
        assert!(outcome.failures.is_empty());
    }
}
