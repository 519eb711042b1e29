//! Per-batch processing pipeline.
//!
//! Modules connected left to right:
//! ```text
//! Extract → Classify / Summarize (work units) → Runner → Writer → Report
//! ```
//!
//! Failure containment rules:
//! - Only a payload that cannot be parsed as a record sequence fails the
//!   batch. Everything below batch level is converted into a typed per-unit
//!   outcome and absorbed.
//! - A work unit never takes a sibling down with it: errors, timeouts and
//!   panics are all caught at the unit boundary.

pub mod extract;
pub mod prompts;
pub mod classify;
pub mod summarize;
pub mod runner;
pub mod orchestrator;

pub use extract::{batch_id_from_key, extract_records};
pub use classify::ClassificationClient;
pub use summarize::{group_by_client, ClientGroup, SummarizationClient};
pub use runner::{BatchRunner, Outcome};
pub use orchestrator::PipelineOrchestrator;

use thiserror::Error;

use crate::models::FailureKind;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Batch-fatal: the payload is not a sequence of note objects.
    #[error("malformed batch payload: {0}")]
    MalformedBatch(String),

    #[error("classification failed: {0}")]
    Classification(String),

    #[error("summarization failed: {0}")]
    Summarization(String),

    #[error("work unit timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("result store write failed: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Map an error to the failure kind recorded in the run report.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Classification(_) => FailureKind::Classification,
            Self::Summarization(_) => FailureKind::Summarization,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Store(_) => FailureKind::StoreWrite,
            Self::MalformedBatch(_) => FailureKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_mapping() {
        assert_eq!(
            PipelineError::Classification("x".into()).failure_kind(),
            FailureKind::Classification
        );
        assert_eq!(
            PipelineError::Timeout { seconds: 30 }.failure_kind(),
            FailureKind::Timeout
        );
        assert_eq!(
            PipelineError::Summarization("x".into()).failure_kind(),
            FailureKind::Summarization
        );
    }
}
