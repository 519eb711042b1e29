//! Pipeline configuration.
//!
//! Everything that used to be ambient (model identifier, store table names,
//! worker-pool size, timeouts) lives in one explicit struct handed to the
//! orchestrator at construction, so tests can inject fakes deterministically.

use crate::models::RiskLabel;

/// Application-level constants
pub const APP_NAME: &str = "Caretriage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,caretriage=debug"
}

/// Retry policy for batched store writes.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total write attempts per chunk (first try included).
    pub max_attempts: u32,
    /// Backoff before the first retry; doubles on each subsequent retry.
    pub base_delay_ms: u64,
    /// Ceiling on any single backoff delay.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

/// Configuration for one pipeline deployment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Model to use for classification and summarisation (e.g. "medgemma:4b").
    pub model_name: String,
    /// Label substituted when a classification reply cannot be parsed.
    pub fallback_label: RiskLabel,
    /// Maximum work units in flight at once.
    pub worker_pool_size: usize,
    /// Deadline for a single work unit, in seconds.
    pub unit_timeout_secs: u64,
    /// Maximum items per store write call.
    pub max_write_batch_size: usize,
    /// Retry policy for rejected store writes.
    pub retry: RetryConfig,
    /// Store table holding per-note classifications.
    pub classification_table: String,
    /// Store table holding per-client summaries.
    pub summary_table: String,
    /// Base URL of the inference service.
    pub inference_base_url: String,
    /// HTTP timeout for a single inference call, in seconds.
    pub inference_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_name: "medgemma:4b".to_string(),
            fallback_label: RiskLabel::Amber,
            worker_pool_size: 8,
            unit_timeout_secs: 30,
            max_write_batch_size: 25,
            retry: RetryConfig::default(),
            classification_table: "visit_classifications".to_string(),
            summary_table: "client_summaries".to_string(),
            inference_base_url: "http://localhost:11434".to_string(),
            inference_timeout_secs: 120,
        }
    }
}

impl PipelineConfig {
    /// Build a config from `CARETRIAGE_*` environment variables, falling back
    /// to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(model) = std::env::var("CARETRIAGE_MODEL") {
            config.model_name = model;
        }
        if let Ok(url) = std::env::var("CARETRIAGE_INFERENCE_URL") {
            config.inference_base_url = url;
        }
        if let Some(workers) = env_parse::<usize>("CARETRIAGE_WORKERS") {
            config.worker_pool_size = workers.max(1);
        }
        if let Some(secs) = env_parse::<u64>("CARETRIAGE_UNIT_TIMEOUT_SECS") {
            config.unit_timeout_secs = secs;
        }
        if let Some(secs) = env_parse::<u64>("CARETRIAGE_INFERENCE_TIMEOUT_SECS") {
            config.inference_timeout_secs = secs;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = PipelineConfig::default();
        assert_eq!(config.fallback_label, RiskLabel::Amber);
        assert_eq!(config.max_write_batch_size, 25);
        assert!(config.worker_pool_size >= 1);
        assert!(config.unit_timeout_secs > 0);
    }

    #[test]
    fn retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 3);
        assert!(retry.base_delay_ms <= retry.max_delay_ms);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
