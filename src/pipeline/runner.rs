//! Bounded concurrent execution of independent work units.
//!
//! The runner owns each unit's lifecycle from dispatch to terminal state.
//! Every unit ends as exactly one `Outcome`: errors, deadline expiry and
//! panics are all converted at the unit boundary, never propagated to
//! siblings or to the pool controller. The returned sequence is always
//! index-aligned with the input regardless of completion order.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::PipelineError;
use crate::models::FailureKind;

/// Terminal state of one work unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Success(T),
    Failure { kind: FailureKind, message: String },
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Bounded worker pool for one batch invocation.
pub struct BatchRunner {
    workers: usize,
    unit_timeout: Duration,
}

impl BatchRunner {
    pub fn new(workers: usize, unit_timeout: Duration) -> Self {
        Self {
            workers: workers.max(1),
            unit_timeout,
        }
    }

    /// Run all units to a terminal state and return their outcomes,
    /// index-aligned with the input.
    ///
    /// At most `workers` units execute concurrently; the per-unit deadline
    /// starts when a unit acquires a worker slot, not when it is queued.
    /// No unit is abandoned; the pool waits for every terminal state.
    pub async fn run<T, Fut>(&self, units: Vec<Fut>) -> Vec<Outcome<T>>
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, PipelineError>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let unit_timeout = self.unit_timeout;

        let handles: Vec<JoinHandle<Outcome<T>>> = units
            .into_iter()
            .map(|unit| {
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return Outcome::Failure {
                                kind: FailureKind::Internal,
                                message: "worker pool closed before unit ran".to_string(),
                            }
                        }
                    };
                    match tokio::time::timeout(unit_timeout, unit).await {
                        Ok(Ok(value)) => Outcome::Success(value),
                        Ok(Err(e)) => Outcome::Failure {
                            kind: e.failure_kind(),
                            message: e.to_string(),
                        },
                        Err(_) => Outcome::Failure {
                            kind: FailureKind::Timeout,
                            message: format!(
                                "work unit exceeded its {}s deadline",
                                unit_timeout.as_secs()
                            ),
                        },
                    }
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) if join_err.is_panic() => Outcome::Failure {
                    kind: FailureKind::Internal,
                    message: "work unit panicked".to_string(),
                },
                Err(join_err) => Outcome::Failure {
                    kind: FailureKind::Internal,
                    message: join_err.to_string(),
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}
