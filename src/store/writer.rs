//! Batched result writing with chunking and bounded retry.
//!
//! Writes are split into chunks no larger than the store's batch-write limit.
//! When a store rejects part of a chunk (throttling) or errors on the whole
//! chunk, only the unwritten subset is retried, with exponential backoff up
//! to a fixed attempt ceiling. Whatever is still unwritten after that is
//! surfaced in the run report's failure list, never silently dropped.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::{ResultStore, StoreError, WriteOutcome};
use crate::config::{PipelineConfig, RetryConfig};
use crate::models::{ClassificationRecord, ClientSummary, FailureKind, UnitFailure};

pub struct ResultWriter {
    store: Arc<dyn ResultStore>,
    max_batch_size: usize,
    retry: RetryConfig,
}

impl ResultWriter {
    pub fn new(store: Arc<dyn ResultStore>, config: &PipelineConfig) -> Self {
        Self {
            store,
            max_batch_size: config.max_write_batch_size.max(1),
            retry: config.retry.clone(),
        }
    }

    /// Persist classification rows. Returned failures are keyed by the
    /// record's own `record_index`.
    pub async fn write_classifications(
        &self,
        items: Vec<ClassificationRecord>,
    ) -> Vec<UnitFailure> {
        if items.is_empty() {
            tracing::debug!("no classification results to write");
            return Vec::new();
        }
        let record_indices: Vec<usize> = items.iter().map(|r| r.record_index).collect();
        let store = Arc::clone(&self.store);
        let unwritten = self
            .drain(items, move |chunk| {
                let store = Arc::clone(&store);
                async move { store.write_classifications(&chunk).await }
            })
            .await;
        unwritten
            .into_iter()
            .map(|(position, message)| UnitFailure {
                index: record_indices[position],
                kind: FailureKind::StoreWrite,
                message,
            })
            .collect()
    }

    /// Persist summary rows. Returned failures are keyed by the item's
    /// position in `items`; the caller maps positions back to its own
    /// group indices.
    pub async fn write_summaries(&self, items: Vec<ClientSummary>) -> Vec<UnitFailure> {
        if items.is_empty() {
            tracing::debug!("no summaries to write");
            return Vec::new();
        }
        let store = Arc::clone(&self.store);
        let unwritten = self
            .drain(items, move |chunk| {
                let store = Arc::clone(&store);
                async move { store.write_summaries(&chunk).await }
            })
            .await;
        unwritten
            .into_iter()
            .map(|(position, message)| UnitFailure {
                index: position,
                kind: FailureKind::StoreWrite,
                message,
            })
            .collect()
    }

    /// Chunk `items`, write each chunk with retry, and return the positions
    /// (into the original `items`) and last error of everything that could
    /// not be written.
    async fn drain<T, F, Fut>(&self, items: Vec<T>, mut write: F) -> Vec<(usize, String)>
    where
        T: Clone,
        F: FnMut(Vec<T>) -> Fut,
        Fut: Future<Output = Result<WriteOutcome, StoreError>>,
    {
        let indexed: Vec<(usize, T)> = items.into_iter().enumerate().collect();
        let mut unwritten: Vec<(usize, String)> = Vec::new();

        for chunk in indexed.chunks(self.max_batch_size) {
            let mut pending: Vec<(usize, T)> = chunk.to_vec();
            let mut last_error = String::new();
            let mut attempt: u32 = 0;

            loop {
                let payload: Vec<T> = pending.iter().map(|(_, item)| item.clone()).collect();
                match write(payload).await {
                    Ok(outcome) if outcome.rejected.is_empty() => {
                        pending.clear();
                        break;
                    }
                    Ok(outcome) => {
                        let rejected: HashSet<usize> = outcome.rejected.into_iter().collect();
                        pending = pending
                            .into_iter()
                            .enumerate()
                            .filter(|(position, _)| rejected.contains(position))
                            .map(|(_, entry)| entry)
                            .collect();
                        last_error = "rejected by result store".to_string();
                        tracing::warn!(
                            rejected = pending.len(),
                            attempt,
                            "result store rejected part of a chunk"
                        );
                    }
                    Err(e) => {
                        last_error = e.to_string();
                        tracing::warn!(error = %e, attempt, "result store write failed for chunk");
                    }
                }

                attempt += 1;
                if attempt >= self.retry.max_attempts {
                    break;
                }
                tokio::time::sleep(self.backoff_delay(attempt)).await;
            }

            for (position, _) in pending {
                unwritten.push((
                    position,
                    format!(
                        "not persisted after {} attempts: {last_error}",
                        self.retry.max_attempts
                    ),
                ));
            }
        }

        unwritten
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let delay = self
            .retry
            .base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.retry.max_delay_ms);
        Duration::from_millis(delay)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::models::{Classification, RiskLabel, VisitRecord};

    /// Scripted store: each call pops the next scripted response and records
    /// the submitted chunk size.
    struct ScriptedStore {
        script: Mutex<Vec<Result<WriteOutcome, StoreError>>>,
        call_sizes: Mutex<Vec<usize>>,
    }

    impl ScriptedStore {
        fn new(script: Vec<Result<WriteOutcome, StoreError>>) -> Self {
            Self {
                script: Mutex::new(script),
                call_sizes: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<usize> {
            self.call_sizes.lock().unwrap().clone()
        }

        fn respond(&self, size: usize) -> Result<WriteOutcome, StoreError> {
            self.call_sizes.lock().unwrap().push(size);
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Ok(WriteOutcome::accepted())
            } else {
                script.remove(0)
            }
        }
    }

    #[async_trait]
    impl ResultStore for ScriptedStore {
        async fn write_classifications(
            &self,
            items: &[ClassificationRecord],
        ) -> Result<WriteOutcome, StoreError> {
            self.respond(items.len())
        }

        async fn write_summaries(
            &self,
            items: &[ClientSummary],
        ) -> Result<WriteOutcome, StoreError> {
            self.respond(items.len())
        }
    }

    fn rows(n: usize) -> Vec<ClassificationRecord> {
        (0..n)
            .map(|i| {
                let visit = VisitRecord {
                    batch_id: "batch-1".to_string(),
                    record_index: i,
                    client: "C".to_string(),
                    care_pro: "P".to_string(),
                    visit_date: "2026-08-01".to_string(),
                    note: "n".to_string(),
                };
                ClassificationRecord::new(
                    &visit,
                    Classification {
                        label: RiskLabel::Green,
                        fallback: false,
                    },
                )
            })
            .collect()
    }

    fn fast_config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.retry = RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        };
        config
    }

    #[tokio::test]
    async fn thirty_items_with_chunk_limit_25_issue_two_calls() {
        let store = Arc::new(ScriptedStore::new(vec![]));
        let writer = ResultWriter::new(Arc::clone(&store) as Arc<dyn ResultStore>, &fast_config());

        let failures = writer.write_classifications(rows(30)).await;

        assert!(failures.is_empty());
        assert_eq!(store.calls(), vec![25, 5]);
    }

    #[tokio::test]
    async fn fully_rejected_chunk_succeeds_on_retry() {
        // First chunk accepted; second chunk rejected wholesale once,
        // accepted on retry.
        let store = Arc::new(ScriptedStore::new(vec![
            Ok(WriteOutcome::accepted()),
            Ok(WriteOutcome {
                rejected: (0..5).collect(),
            }),
            Ok(WriteOutcome::accepted()),
        ]));
        let writer = ResultWriter::new(Arc::clone(&store) as Arc<dyn ResultStore>, &fast_config());

        let failures = writer.write_classifications(rows(30)).await;

        assert!(failures.is_empty());
        assert_eq!(store.calls(), vec![25, 5, 5]);
    }

    #[tokio::test]
    async fn partial_rejection_retries_only_rejected_subset() {
        let store = Arc::new(ScriptedStore::new(vec![
            Ok(WriteOutcome {
                rejected: vec![1, 3],
            }),
            Ok(WriteOutcome::accepted()),
        ]));
        let writer = ResultWriter::new(Arc::clone(&store) as Arc<dyn ResultStore>, &fast_config());

        let failures = writer.write_classifications(rows(5)).await;

        assert!(failures.is_empty());
        assert_eq!(store.calls(), vec![5, 2]);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_failures_by_record_index() {
        // Every attempt rejects item at chunk position 2.
        let store = Arc::new(ScriptedStore::new(vec![
            Ok(WriteOutcome { rejected: vec![2] }),
            Ok(WriteOutcome { rejected: vec![0] }),
            Ok(WriteOutcome { rejected: vec![0] }),
        ]));
        let writer = ResultWriter::new(Arc::clone(&store) as Arc<dyn ResultStore>, &fast_config());

        let failures = writer.write_classifications(rows(5)).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 2);
        assert_eq!(failures[0].kind, FailureKind::StoreWrite);
        assert_eq!(store.calls(), vec![5, 1, 1]);
    }

    #[tokio::test]
    async fn store_error_is_retried_as_full_rejection() {
        let store = Arc::new(ScriptedStore::new(vec![
            Err(StoreError::Unavailable("throttled".to_string())),
            Ok(WriteOutcome::accepted()),
        ]));
        let writer = ResultWriter::new(Arc::clone(&store) as Arc<dyn ResultStore>, &fast_config());

        let failures = writer.write_classifications(rows(3)).await;

        assert!(failures.is_empty());
        assert_eq!(store.calls(), vec![3, 3]);
    }

    #[tokio::test]
    async fn persistent_store_error_fails_every_item_in_chunk() {
        let store = Arc::new(ScriptedStore::new(vec![
            Err(StoreError::Unavailable("down".to_string())),
            Err(StoreError::Unavailable("down".to_string())),
            Err(StoreError::Unavailable("down".to_string())),
        ]));
        let writer = ResultWriter::new(Arc::clone(&store) as Arc<dyn ResultStore>, &fast_config());

        let failures = writer.write_classifications(rows(3)).await;

        assert_eq!(failures.len(), 3);
        let indices: Vec<usize> = failures.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(failures.iter().all(|f| f.kind == FailureKind::StoreWrite));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let store = Arc::new(ScriptedStore::new(vec![]));
        let mut config = PipelineConfig::default();
        config.retry = RetryConfig {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
        };
        let writer = ResultWriter::new(store as Arc<dyn ResultStore>, &config);

        assert_eq!(writer.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(writer.backoff_delay(2), Duration::from_millis(200));
        assert_eq!(writer.backoff_delay(3), Duration::from_millis(400));
        assert_eq!(writer.backoff_delay(5), Duration::from_millis(1_000));
        assert_eq!(writer.backoff_delay(30), Duration::from_millis(1_000));
    }
}
