//! Abstraction over the text-completion service used for enrichment.

use crate::core::error::ServiceError;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Versioned prompt identifier, e.g. `summary@v1`
    pub prompt_id: String,
    pub instructions: String,
    pub input: String,
}

/// A single call to the completion service. Retries, timeouts and
/// concurrency limits are applied by the caller.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError>;
}
