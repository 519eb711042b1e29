use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::types::InferenceClient;
use super::InferenceError;

/// HTTP client for an Ollama-compatible inference service.
pub struct HttpInferenceClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpInferenceClient {
    /// Create a client pointing at `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Request body for /api/generate
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

/// Response body from /api/generate
#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<String, InferenceError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model,
            prompt,
            system,
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    InferenceError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    InferenceError::Timeout(self.timeout_secs)
                } else {
                    InferenceError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }
}

/// Mock inference client for testing.
///
/// Returns a configurable default reply, with optional per-marker replies,
/// artificial latency, and forced errors.
pub struct MockInferenceClient {
    default_reply: String,
    replies: Vec<(String, String)>,
    latency_on: Option<(String, Duration)>,
    error: Option<String>,
}

impl MockInferenceClient {
    pub fn new(reply: &str) -> Self {
        Self {
            default_reply: reply.to_string(),
            replies: Vec::new(),
            latency_on: None,
            error: None,
        }
    }

    /// Always fail with a transport error.
    pub fn erroring(message: &str) -> Self {
        Self {
            default_reply: String::new(),
            replies: Vec::new(),
            latency_on: None,
            error: Some(message.to_string()),
        }
    }

    /// When the prompt contains `marker`, reply with `reply` instead of the
    /// default.
    pub fn with_reply_for(mut self, marker: &str, reply: &str) -> Self {
        self.replies.push((marker.to_string(), reply.to_string()));
        self
    }

    /// When the prompt contains `marker`, sleep before replying.
    pub fn with_latency_on(mut self, marker: &str, latency: Duration) -> Self {
        self.latency_on = Some((marker.to_string(), latency));
        self
    }
}

#[async_trait]
impl InferenceClient for MockInferenceClient {
    async fn generate(
        &self,
        _model: &str,
        prompt: &str,
        _system: &str,
    ) -> Result<String, InferenceError> {
        if let Some(message) = &self.error {
            return Err(InferenceError::Transport(message.clone()));
        }
        if let Some((marker, latency)) = &self.latency_on {
            if prompt.contains(marker.as_str()) {
                tokio::time::sleep(*latency).await;
            }
        }
        for (marker, reply) in &self.replies {
            if prompt.contains(marker.as_str()) {
                return Ok(reply.clone());
            }
        }
        Ok(self.default_reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = HttpInferenceClient::new("http://localhost:11434/", 60);
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.timeout_secs, 60);
    }

    #[tokio::test]
    async fn mock_returns_default_reply() {
        let client = MockInferenceClient::new("GREEN");
        let reply = client.generate("m", "any prompt", "sys").await.unwrap();
        assert_eq!(reply, "GREEN");
    }

    #[tokio::test]
    async fn mock_routes_by_marker() {
        let client = MockInferenceClient::new("GREEN").with_reply_for("fell", "RED");
        let reply = client
            .generate("m", "Client fell in the bathroom", "sys")
            .await
            .unwrap();
        assert_eq!(reply, "RED");
    }

    #[tokio::test]
    async fn mock_erroring_fails() {
        let client = MockInferenceClient::erroring("down for maintenance");
        let err = client.generate("m", "p", "s").await.unwrap_err();
        assert!(matches!(err, InferenceError::Transport(_)));
    }
}
