//! Top-level pipeline orchestration, invoked once per batch notification.
//!
//! Each invocation walks a fixed stage sequence:
//! `Received → Extracted → Dispatched → Collected → Persisted → Reported`.
//! Only extraction can fail the batch (early exit from `Received`); every
//! per-record and per-client failure is absorbed into the collected outcome
//! list, and the invocation always ends with a logged run report.
//!
//! Invocations share no mutable state, so concurrent batches scale out
//! independently; redelivered notifications are harmless because all writes
//! go through the store's idempotency keys.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use super::classify::ClassificationClient;
use super::extract::{batch_id_from_key, extract_records};
use super::runner::{BatchRunner, Outcome};
use super::summarize::{group_by_client, SummarizationClient};
use crate::config::PipelineConfig;
use crate::inference::InferenceClient;
use crate::models::{BatchOutcome, ClassificationRecord, ClientSummary, RiskLabel, UnitFailure};
use crate::store::{ResultStore, ResultWriter};

/// Stage of one pipeline invocation, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunStage {
    Received,
    Extracted,
    Dispatched,
    Collected,
    Persisted,
    Reported,
}

impl RunStage {
    fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Extracted => "extracted",
            Self::Dispatched => "dispatched",
            Self::Collected => "collected",
            Self::Persisted => "persisted",
            Self::Reported => "reported",
        }
    }
}

/// Per-run classification tally, logged in the run report.
#[derive(Debug, Default)]
struct LabelTally {
    red: u32,
    amber: u32,
    green: u32,
    fallbacks: u32,
}

impl LabelTally {
    fn count(&mut self, label: RiskLabel, fallback: bool) {
        match label {
            RiskLabel::Red => self.red += 1,
            RiskLabel::Amber => self.amber += 1,
            RiskLabel::Green => self.green += 1,
        }
        if fallback {
            self.fallbacks += 1;
        }
    }
}

pub struct PipelineOrchestrator {
    config: PipelineConfig,
    inference: Arc<dyn InferenceClient>,
    store: Arc<dyn ResultStore>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: PipelineConfig,
        inference: Arc<dyn InferenceClient>,
        store: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            config,
            inference,
            store,
        }
    }

    /// Classify every note in a batch and persist the results.
    ///
    /// Always returns a run report; `BatchStatus::BatchFailed` appears only
    /// when the payload never yielded a record sequence.
    pub async fn run_classification(&self, object_key: &str, payload: &str) -> BatchOutcome {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let batch_id = resolve_batch_id(object_key);
        trace_stage(run_id, &batch_id, RunStage::Received);

        let records = match extract_records(&batch_id, payload) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(%run_id, batch_id, error = %e, "batch failed during extraction");
                return BatchOutcome::failed(&batch_id, e.to_string(), elapsed_ms(started));
            }
        };
        trace_stage(run_id, &batch_id, RunStage::Extracted);
        tracing::info!(%run_id, batch_id, records = records.len(), "extracted visit records");

        let classifier = Arc::new(ClassificationClient::new(
            Arc::clone(&self.inference),
            &self.config,
        ));
        let units: Vec<_> = records
            .iter()
            .map(|record| {
                let classifier = Arc::clone(&classifier);
                let note = record.note.clone();
                async move { classifier.classify(&note).await }
            })
            .collect();

        trace_stage(run_id, &batch_id, RunStage::Dispatched);
        let outcomes = self.runner().run(units).await;
        trace_stage(run_id, &batch_id, RunStage::Collected);

        let mut rows: Vec<ClassificationRecord> = Vec::new();
        let mut failures: Vec<UnitFailure> = Vec::new();
        let mut tally = LabelTally::default();
        for (record, outcome) in records.iter().zip(outcomes) {
            match outcome {
                Outcome::Success(classification) => {
                    tally.count(classification.label, classification.fallback);
                    rows.push(ClassificationRecord::new(record, classification));
                }
                Outcome::Failure { kind, message } => failures.push(UnitFailure {
                    index: record.record_index,
                    kind,
                    message,
                }),
            }
        }

        let writer = ResultWriter::new(Arc::clone(&self.store), &self.config);
        failures.extend(writer.write_classifications(rows).await);
        trace_stage(run_id, &batch_id, RunStage::Persisted);

        failures.sort_by_key(|f| f.index);
        let outcome = BatchOutcome {
            batch_id,
            total_records: records.len(),
            succeeded_count: records.len() - failures.len(),
            failed_count: failures.len(),
            failures,
            duration_ms: elapsed_ms(started),
            batch_error: None,
        };
        self.report(run_id, &outcome, Some(&tally));
        outcome
    }

    /// Summarise each client's notes within a batch and persist the results.
    ///
    /// Work units (and failure indices in the report) are per client group,
    /// in first-appearance order.
    pub async fn run_summaries(&self, object_key: &str, payload: &str) -> BatchOutcome {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let batch_id = resolve_batch_id(object_key);
        trace_stage(run_id, &batch_id, RunStage::Received);

        let records = match extract_records(&batch_id, payload) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(%run_id, batch_id, error = %e, "batch failed during extraction");
                return BatchOutcome::failed(&batch_id, e.to_string(), elapsed_ms(started));
            }
        };
        let groups = group_by_client(&records);
        trace_stage(run_id, &batch_id, RunStage::Extracted);
        tracing::info!(
            %run_id,
            batch_id,
            records = records.len(),
            clients = groups.len(),
            "grouped visit records by client"
        );

        let summarizer = Arc::new(SummarizationClient::new(
            Arc::clone(&self.inference),
            &self.config,
        ));
        let units: Vec<_> = groups
            .iter()
            .map(|group| {
                let summarizer = Arc::clone(&summarizer);
                let group = group.clone();
                async move { summarizer.summarize(&group).await }
            })
            .collect();

        trace_stage(run_id, &batch_id, RunStage::Dispatched);
        let outcomes = self.runner().run(units).await;
        trace_stage(run_id, &batch_id, RunStage::Collected);

        let mut summaries: Vec<ClientSummary> = Vec::new();
        // Group index of each collected summary, for mapping write failures back.
        let mut summary_groups: Vec<usize> = Vec::new();
        let mut failures: Vec<UnitFailure> = Vec::new();
        for (group_index, (group, outcome)) in groups.iter().zip(outcomes).enumerate() {
            match outcome {
                Outcome::Success(text) => {
                    summary_groups.push(group_index);
                    summaries.push(ClientSummary {
                        batch_id: batch_id.clone(),
                        client: group.client.clone(),
                        summary: text,
                        source_record_count: group.source_record_count,
                        latest_visit_date: group.latest_visit_date.clone(),
                        timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                    });
                }
                Outcome::Failure { kind, message } => failures.push(UnitFailure {
                    index: group_index,
                    kind,
                    message,
                }),
            }
        }

        let writer = ResultWriter::new(Arc::clone(&self.store), &self.config);
        failures.extend(
            writer
                .write_summaries(summaries)
                .await
                .into_iter()
                .map(|f| UnitFailure {
                    index: summary_groups[f.index],
                    kind: f.kind,
                    message: f.message,
                }),
        );
        trace_stage(run_id, &batch_id, RunStage::Persisted);

        failures.sort_by_key(|f| f.index);
        let outcome = BatchOutcome {
            batch_id,
            total_records: groups.len(),
            succeeded_count: groups.len() - failures.len(),
            failed_count: failures.len(),
            failures,
            duration_ms: elapsed_ms(started),
            batch_error: None,
        };
        self.report(run_id, &outcome, None);
        outcome
    }

    fn runner(&self) -> BatchRunner {
        BatchRunner::new(
            self.config.worker_pool_size,
            Duration::from_secs(self.config.unit_timeout_secs),
        )
    }

    fn report(&self, run_id: Uuid, outcome: &BatchOutcome, tally: Option<&LabelTally>) {
        trace_stage(run_id, &outcome.batch_id, RunStage::Reported);
        tracing::info!(
            %run_id,
            batch_id = %outcome.batch_id,
            total = outcome.total_records,
            succeeded = outcome.succeeded_count,
            failed = outcome.failed_count,
            duration_ms = outcome.duration_ms,
            status = ?outcome.status(),
            "batch run complete"
        );
        if let Some(tally) = tally {
            tracing::info!(
                %run_id,
                red = tally.red,
                amber = tally.amber,
                green = tally.green,
                fallbacks = tally.fallbacks,
                "classification tally"
            );
        }
        for failure in &outcome.failures {
            tracing::warn!(
                %run_id,
                index = failure.index,
                kind = %failure.kind,
                message = %failure.message,
                "unit failed"
            );
        }
    }
}

fn resolve_batch_id(object_key: &str) -> String {
    match batch_id_from_key(object_key) {
        Some(id) => id,
        None => {
            tracing::warn!(
                object_key,
                "object key does not yield a plausible batch id, using the key itself"
            );
            object_key.to_string()
        }
    }
}

fn trace_stage(run_id: Uuid, batch_id: &str, stage: RunStage) {
    tracing::debug!(%run_id, batch_id, stage = stage.as_str(), "pipeline stage");
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
