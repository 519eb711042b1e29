use async_trait::async_trait;

use super::InferenceError;

/// Text-in / text-out inference call.
///
/// Implementations must be stateless between calls. Concurrency safety in
/// the pipeline derives from each work unit being independently retryable,
/// not from locking inside the client.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<String, InferenceError>;
}
