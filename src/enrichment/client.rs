use crate::core::cache::Stage;
use crate::core::completion::{CompletionBackend, CompletionRequest};
use crate::core::config::EnrichmentConfig;
use crate::core::error::{BriefingError, ServiceError};
use crate::core::news::{NewsItem, Sentiment};
use crate::core::retry::{RetryPolicy, with_retry};
use crate::enrichment::prompts;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

/// Reads the classifier's answer. Unrecognized answers count as neutral.
pub fn parse_sentiment(answer: &str) -> Sentiment {
    Sentiment::from_label(answer).unwrap_or_else(|| {
        warn!(answer, "Unrecognized sentiment label, using neutral");
        Sentiment::Neutral
    })
}

/// Talks to the completion service under a shared permit pool.
///
/// Every attempt holds one permit for at most `call_timeout`; the permit is
/// given back before a retry backs off, so a failing call never starves the
/// others. Attempts beyond the pool size wait for a permit.
pub struct EnrichmentClient {
    backend: Arc<dyn CompletionBackend>,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
    policy: RetryPolicy,
    call_timeout: Duration,
    prompt_version: String,
}

impl EnrichmentClient {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        max_in_flight: usize,
        policy: RetryPolicy,
        call_timeout: Duration,
        prompt_version: &str,
    ) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            backend,
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            policy,
            call_timeout,
            prompt_version: prompt_version.to_string(),
        }
    }

    pub fn from_config(backend: Arc<dyn CompletionBackend>, config: &EnrichmentConfig) -> Self {
        Self::new(
            backend,
            config.max_in_flight,
            config.retry_policy(),
            config.call_timeout(),
            &config.prompt_version,
        )
    }

    pub fn prompt_version(&self) -> &str {
        &self.prompt_version
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub async fn summarize(&self, item: &NewsItem) -> Result<String, BriefingError> {
        self.call(Stage::Summary, prompts::summary_input(item)).await
    }

    pub async fn classify(&self, summary: &str) -> Result<Sentiment, BriefingError> {
        let answer = self.call(Stage::Sentiment, summary.to_string()).await?;
        Ok(parse_sentiment(&answer))
    }

    pub async fn overview(&self, input: String) -> Result<String, BriefingError> {
        self.call(Stage::Overview, input).await
    }

    #[instrument(name = "Enrichment", skip(self, stage, input), fields(stage = %stage))]
    async fn call(&self, stage: Stage, input: String) -> Result<String, BriefingError> {
        let request = CompletionRequest {
            prompt_id: prompts::prompt_id(stage, &self.prompt_version),
            instructions: prompts::instructions(stage).to_string(),
            input,
        };

        with_retry(&self.policy, |attempt| self.attempt(&request, attempt))
            .await
            .map_err(|exhausted| {
                warn!(
                    attempts = exhausted.attempts,
                    error = %exhausted.error,
                    "Enrichment call gave up"
                );
                BriefingError::EnrichmentUnavailable {
                    stage: stage.to_string(),
                    attempts: exhausted.attempts,
                    reason: exhausted.error.to_string(),
                }
            })
    }

    async fn attempt(
        &self,
        request: &CompletionRequest,
        attempt: usize,
    ) -> Result<String, ServiceError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ServiceError::Cancelled(e.to_string()))?;
        debug!(attempt, prompt = %request.prompt_id, "Calling completion service");

        tokio::time::timeout(self.call_timeout, self.backend.complete(request))
            .await
            .map_err(|_| ServiceError::Timeout(self.call_timeout))?
    }
}
