use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Shared cut-off for every concurrent branch of a run.
///
/// Branches run their work through [`Deadline::run`]; once the instant passes,
/// the in-flight future is dropped and the branch yields `None` instead of an
/// error, so the caller can assemble whatever finished in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Some(Instant::now() + budget),
        }
    }

    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        match self.at {
            Some(at) => tokio::time::timeout_at(at, fut).await.ok(),
            None => Some(fut.await),
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}
