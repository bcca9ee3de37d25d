//! Error taxonomy for a briefing run.
//!
//! Only [`BriefingError::AllPricesUnavailable`] and
//! [`BriefingError::NoSourceReachable`] abort a run. Every other variant is
//! absorbed and logged where it happens.

use crate::core::news::NewsSource;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BriefingError {
    /// A news source did not answer within the per-call timeout.
    #[error("Fetch from {feed} timed out for query: {query}")]
    FetchTimeout { feed: NewsSource, query: String },

    /// A news source answered with an error or an unreadable feed.
    #[error("Fetch from {feed} failed: {message}")]
    FetchError { feed: NewsSource, message: String },

    /// The enrichment service could not produce a result for one item.
    #[error("Enrichment unavailable for stage {stage} after {attempts} attempt(s): {reason}")]
    EnrichmentUnavailable {
        stage: String,
        attempts: usize,
        reason: String,
    },

    /// No usable price data for one ticker.
    #[error("Price unavailable for {ticker}: {reason}")]
    PriceUnavailable { ticker: String, reason: String },

    #[error("Price data unavailable for the entire portfolio")]
    AllPricesUnavailable,

    #[error("No upstream news source is reachable")]
    NoSourceReachable,

    /// The overall run deadline elapsed while the stage was in progress.
    #[error("Deadline exceeded during {stage}")]
    DeadlineExceeded { stage: String },
}

impl BriefingError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AllPricesUnavailable | Self::NoSourceReachable)
    }
}

/// Failure of a single call to an upstream HTTP service.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate limited (HTTP 429)")]
    RateLimited,

    #[error("Server error: HTTP {0}")]
    Server(u16),

    #[error("Request rejected: HTTP {status}: {message}")]
    Client { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request cancelled: {0}")]
    Cancelled(String),
}

impl ServiceError {
    /// Maps a non-success HTTP status to its error class.
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimited
        } else if status.is_server_error() {
            Self::Server(status.as_u16())
        } else {
            Self::Client {
                status: status.as_u16(),
                message,
            }
        }
    }

    /// Timeouts, rate limits, 5xx answers and connection failures are worth
    /// another attempt. Rejected requests and unreadable bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RateLimited | Self::Server(_) => true,
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Client { .. } | Self::InvalidResponse(_) | Self::Cancelled(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_price_and_reachability_errors_are_fatal() {
        assert!(BriefingError::AllPricesUnavailable.is_fatal());
        assert!(BriefingError::NoSourceReachable.is_fatal());
        assert!(
            !BriefingError::FetchTimeout {
                feed: NewsSource::Bing,
                query: "AAPL".to_string()
            }
            .is_fatal()
        );
        assert!(
            !BriefingError::PriceUnavailable {
                ticker: "AAPL".to_string(),
                reason: "no data".to_string()
            }
            .is_fatal()
        );
        assert!(
            !BriefingError::DeadlineExceeded {
                stage: "Enriching".to_string()
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_status_classification() {
        let err = ServiceError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(matches!(err, ServiceError::RateLimited));
        assert!(err.is_transient());

        let err = ServiceError::from_status(reqwest::StatusCode::BAD_GATEWAY, String::new());
        assert!(matches!(err, ServiceError::Server(502)));
        assert!(err.is_transient());

        let err = ServiceError::from_status(reqwest::StatusCode::UNAUTHORIZED, "bad key".into());
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "Request rejected: HTTP 401: bad key");
    }

    #[test]
    fn test_timeout_is_transient_and_invalid_response_is_not() {
        assert!(ServiceError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!ServiceError::InvalidResponse("empty".into()).is_transient());
    }
}
