//! Per-client note grouping and narrative summarisation.

use std::collections::HashMap;
use std::sync::Arc;

use super::prompts;
use super::PipelineError;
use crate::config::PipelineConfig;
use crate::inference::{InferenceClient, InferenceError};
use crate::models::VisitRecord;

/// Grouping key for records whose client field is blank.
const UNKNOWN_CLIENT: &str = "Unknown";

/// One client's notes within a batch, ready for summarisation.
#[derive(Debug, Clone)]
pub struct ClientGroup {
    pub client: String,
    /// Non-empty notes, oldest visit first.
    pub notes: Vec<String>,
    /// All records grouped under this client, empty notes included.
    pub source_record_count: usize,
    pub latest_visit_date: String,
}

/// Group a batch's records by client identity, preserving first-appearance
/// order of clients. Within a group, notes are sorted chronologically by
/// visit date and blank notes are dropped.
pub fn group_by_client(records: &[VisitRecord]) -> Vec<ClientGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<&VisitRecord>> = HashMap::new();

    for record in records {
        let client = if record.client.trim().is_empty() {
            UNKNOWN_CLIENT.to_string()
        } else {
            record.client.clone()
        };
        if !buckets.contains_key(&client) {
            order.push(client.clone());
        }
        buckets.entry(client).or_default().push(record);
    }

    order
        .into_iter()
        .map(|client| {
            let mut members = buckets.remove(&client).unwrap_or_default();
            members.sort_by(|a, b| a.visit_date.cmp(&b.visit_date));
            let latest_visit_date = members
                .iter()
                .map(|r| r.visit_date.as_str())
                .max()
                .unwrap_or_default()
                .to_string();
            let notes = members
                .iter()
                .map(|r| r.note.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect();
            ClientGroup {
                client,
                source_record_count: members.len(),
                latest_visit_date,
                notes,
            }
        })
        .collect()
}

/// Produces a prose summary for one client group.
pub struct SummarizationClient {
    inference: Arc<dyn InferenceClient>,
    model: String,
}

impl SummarizationClient {
    pub fn new(inference: Arc<dyn InferenceClient>, config: &PipelineConfig) -> Self {
        Self {
            inference,
            model: config.model_name.clone(),
        }
    }

    /// Summarise one client's notes.
    ///
    /// A group with zero usable notes and an empty service reply are both
    /// per-client failures; the rest of the batch proceeds.
    pub async fn summarize(&self, group: &ClientGroup) -> Result<String, PipelineError> {
        if group.notes.is_empty() {
            return Err(PipelineError::Summarization(format!(
                "client '{}' has no non-empty notes to summarise",
                group.client
            )));
        }

        let prompt = prompts::summary_prompt(&group.notes);
        let reply = self
            .inference
            .generate(&self.model, &prompt, prompts::SUMMARY_SYSTEM)
            .await
            .map_err(summarization_error)?;

        let summary = reply.trim();
        if summary.is_empty() {
            return Err(PipelineError::Summarization(format!(
                "inference service returned an empty summary for client '{}'",
                group.client
            )));
        }
        Ok(summary.to_string())
    }
}

fn summarization_error(err: InferenceError) -> PipelineError {
    match err {
        InferenceError::Timeout(seconds) => PipelineError::Timeout { seconds },
        other => PipelineError::Summarization(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::MockInferenceClient;

    fn record(index: usize, client: &str, date: &str, note: &str) -> VisitRecord {
        VisitRecord {
            batch_id: "batch-1".to_string(),
            record_index: index,
            client: client.to_string(),
            care_pro: "P".to_string(),
            visit_date: date.to_string(),
            note: note.to_string(),
        }
    }

    #[test]
    fn groups_preserve_first_appearance_order() {
        let records = vec![
            record(0, "Ben", "2026-08-01", "b1"),
            record(1, "Ada", "2026-08-01", "a1"),
            record(2, "Ben", "2026-08-02", "b2"),
        ];
        let groups = group_by_client(&records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].client, "Ben");
        assert_eq!(groups[1].client, "Ada");
        assert_eq!(groups[0].source_record_count, 2);
    }

    #[test]
    fn notes_sorted_chronologically() {
        let records = vec![
            record(0, "Ada", "2026-08-03", "latest"),
            record(1, "Ada", "2026-08-01", "earliest"),
            record(2, "Ada", "2026-08-02", "middle"),
        ];
        let groups = group_by_client(&records);
        assert_eq!(groups[0].notes, vec!["earliest", "middle", "latest"]);
        assert_eq!(groups[0].latest_visit_date, "2026-08-03");
    }

    #[test]
    fn blank_client_grouped_as_unknown() {
        let records = vec![record(0, "  ", "2026-08-01", "n")];
        let groups = group_by_client(&records);
        assert_eq!(groups[0].client, "Unknown");
    }

    #[test]
    fn empty_notes_dropped_but_counted() {
        let records = vec![
            record(0, "Ada", "2026-08-01", "real note"),
            record(1, "Ada", "2026-08-02", "   "),
        ];
        let groups = group_by_client(&records);
        assert_eq!(groups[0].notes.len(), 1);
        assert_eq!(groups[0].source_record_count, 2);
    }

    #[tokio::test]
    async fn summarizes_a_group() {
        let client = SummarizationClient::new(
            Arc::new(MockInferenceClient::new("  A stable week overall. \n")),
            &PipelineConfig::default(),
        );
        let group = ClientGroup {
            client: "Ada".to_string(),
            notes: vec!["note one".to_string(), "note two".to_string()],
            source_record_count: 2,
            latest_visit_date: "2026-08-02".to_string(),
        };
        let summary = client.summarize(&group).await.unwrap();
        assert_eq!(summary, "A stable week overall.");
    }

    #[tokio::test]
    async fn empty_group_is_a_summarization_error() {
        let client = SummarizationClient::new(
            Arc::new(MockInferenceClient::new("unused")),
            &PipelineConfig::default(),
        );
        let group = ClientGroup {
            client: "Ada".to_string(),
            notes: Vec::new(),
            source_record_count: 1,
            latest_visit_date: String::new(),
        };
        let err = client.summarize(&group).await.unwrap_err();
        assert!(matches!(err, PipelineError::Summarization(_)));
    }

    #[tokio::test]
    async fn empty_reply_is_a_summarization_error() {
        let client = SummarizationClient::new(
            Arc::new(MockInferenceClient::new("   ")),
            &PipelineConfig::default(),
        );
        let group = ClientGroup {
            client: "Ada".to_string(),
            notes: vec!["note".to_string()],
            source_record_count: 1,
            latest_visit_date: "2026-08-01".to_string(),
        };
        let err = client.summarize(&group).await.unwrap_err();
        assert!(matches!(err, PipelineError::Summarization(_)));
    }
}
