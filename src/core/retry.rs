use crate::core::error::ServiceError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Bounded retry with exponential backoff, shared by every upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total runs = 1 initial + retries)
    pub max_retries: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Delay before retry number `retry` (1-based): `base * 2^(retry - 1)`, capped.
    pub fn backoff(&self, retry: usize) -> Duration {
        let exponent = retry.saturating_sub(1).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500), Duration::from_secs(8))
    }
}

/// The last error once retries ran out or a non-transient error came back.
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: usize,
    pub error: ServiceError,
}

/// Runs `operation` until it succeeds, fails with a non-transient error, or
/// the policy is exhausted. The closure receives the 1-based attempt number.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(val) => return Ok(val),
            Err(error) => {
                if !error.is_transient() || attempt > policy.max_retries {
                    return Err(RetryExhausted {
                        attempts: attempt,
                        error,
                    });
                }
                let delay = policy.backoff(attempt);
                debug!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}...",
                    attempt,
                    policy.max_retries + 1,
                    error,
                    delay
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}
