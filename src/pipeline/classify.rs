//! Per-note risk classification with defensive reply parsing.

use std::sync::Arc;

use regex::Regex;

use super::prompts;
use super::PipelineError;
use crate::config::PipelineConfig;
use crate::inference::{InferenceClient, InferenceError};
use crate::models::{Classification, RiskLabel};

/// Classifies one visit note into a risk label.
///
/// Parsing policy: the reply is trimmed and lowercased, then scanned for
/// word-bounded label tokens. Exactly one distinct token is a genuine
/// classification; none or several means the reply is unusable and the
/// configured fallback label is substituted with `fallback: true` so audits
/// can tell the two apart.
pub struct ClassificationClient {
    inference: Arc<dyn InferenceClient>,
    model: String,
    fallback: RiskLabel,
    token_re: Regex,
}

impl ClassificationClient {
    pub fn new(inference: Arc<dyn InferenceClient>, config: &PipelineConfig) -> Self {
        Self {
            inference,
            model: config.model_name.clone(),
            fallback: config.fallback_label,
            // Word boundaries matter: "hundred" must not read as "red".
            token_re: Regex::new(r"\b(red|amber|green)\b").expect("valid label regex"),
        }
    }

    /// Classify one note.
    ///
    /// An empty note is routine by definition and never reaches the service.
    /// Service-level failures (unreachable, HTTP error, timeout) surface as
    /// errors for the caller to record; only reply-parsing ambiguity is
    /// absorbed into the fallback label.
    pub async fn classify(&self, note: &str) -> Result<Classification, PipelineError> {
        let note = note.trim();
        if note.is_empty() {
            return Ok(Classification {
                label: RiskLabel::Green,
                fallback: false,
            });
        }

        let prompt = prompts::classification_prompt(note);
        let reply = self
            .inference
            .generate(&self.model, &prompt, prompts::CLASSIFY_SYSTEM)
            .await
            .map_err(classification_error)?;

        Ok(self.parse_reply(&reply))
    }

    fn parse_reply(&self, reply: &str) -> Classification {
        let normalized = reply.trim().to_lowercase();

        let mut found: Vec<RiskLabel> = Vec::new();
        for token in self.token_re.find_iter(&normalized) {
            if let Some(label) = RiskLabel::parse(token.as_str()) {
                if !found.contains(&label) {
                    found.push(label);
                }
            }
        }

        match found.as_slice() {
            [label] => Classification {
                label: *label,
                fallback: false,
            },
            _ => {
                tracing::warn!(
                    reply = %reply.trim(),
                    labels_found = found.len(),
                    fallback = %self.fallback,
                    "unparseable classification reply, substituting fallback label"
                );
                Classification {
                    label: self.fallback,
                    fallback: true,
                }
            }
        }
    }
}

fn classification_error(err: InferenceError) -> PipelineError {
    match err {
        InferenceError::Timeout(seconds) => PipelineError::Timeout { seconds },
        other => PipelineError::Classification(other.to_string()),
    }
}
