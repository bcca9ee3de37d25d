use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::error::{BriefingError, ServiceError};
use crate::core::price::{Direction, PriceProvider, PriceQuote};
use crate::core::retry::{RetryPolicy, with_retry};

/// Daily change from the chart's last two closes. Falls back to the chart's
/// previous close when only one bar is present.
fn daily_change(item: &PriceChartItem) -> Option<f64> {
    let closes: Vec<f64> = item
        .indicators
        .as_ref()
        .and_then(|inds| inds.quote.first())
        .and_then(|q| q.close.as_ref())
        .map(|closes| closes.iter().flatten().copied().collect())
        .unwrap_or_default();

    let (current, previous) = match closes.as_slice() {
        [.., previous, current] => (*current, *previous),
        [current] => (*current, item.meta.previous_close?),
        [] => (item.meta.regular_market_price?, item.meta.previous_close?),
    };

    if previous > 0.0 {
        Some(((current - previous) / previous) * 100.0)
    } else {
        None
    }
}

fn last_trading_day(item: &PriceChartItem) -> Option<NaiveDate> {
    item.timestamp
        .as_ref()
        .and_then(|ts| ts.last())
        .and_then(|ts| Utc.timestamp_opt(*ts, 0).single())
        .map(|dt| dt.date_naive())
}

pub struct YahooPriceProvider {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    policy: RetryPolicy,
    flat_threshold: f64,
}

impl YahooPriceProvider {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        policy: RetryPolicy,
        flat_threshold: f64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("tickerbrief/0.1")
            .build()?;
        Ok(YahooPriceProvider {
            base_url: base_url.to_string(),
            client,
            timeout,
            policy,
            flat_threshold,
        })
    }

    async fn request_chart(&self, url: &str) -> Result<YahooPriceResponse, ServiceError> {
        let send = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ServiceError::from_status(status, body));
            }
            let text = response.text().await?;
            serde_json::from_str::<YahooPriceResponse>(&text)
                .map_err(|e| ServiceError::InvalidResponse(e.to_string()))
        };
        tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| ServiceError::Timeout(self.timeout))?
    }
}

#[derive(Deserialize, Debug)]
struct YahooPriceResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Option<Vec<PriceChartItem>>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(alias = "chartPreviousClose")]
    previous_close: Option<f64>,
}

#[async_trait]
impl PriceProvider for YahooPriceProvider {
    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(ticker = %ticker)
    )]
    async fn fetch_quote(&self, ticker: &str) -> Result<PriceQuote, BriefingError> {
        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=10d",
            self.base_url,
            urlencoding::encode(ticker)
        );
        debug!("Requesting price data from {}", url);

        let data = with_retry(&self.policy, |_| self.request_chart(&url))
            .await
            .map_err(|exhausted| BriefingError::PriceUnavailable {
                ticker: ticker.to_string(),
                reason: exhausted.error.to_string(),
            })?;

        let item = data
            .chart
            .result
            .as_ref()
            .and_then(|r| r.first())
            .ok_or_else(|| BriefingError::PriceUnavailable {
                ticker: ticker.to_string(),
                reason: "No price data found".to_string(),
            })?;

        let change_percent = daily_change(item).ok_or_else(|| BriefingError::PriceUnavailable {
            ticker: ticker.to_string(),
            reason: "Not enough closing prices".to_string(),
        })?;

        Ok(PriceQuote {
            ticker: ticker.to_string(),
            change_percent,
            direction: Direction::from_change(change_percent, self.flat_threshold),
            last_trading_day: last_trading_day(item),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(ticker: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{ticker}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .and(query_param("range", "10d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(uri: &str) -> YahooPriceProvider {
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(2));
        YahooPriceProvider::new(uri, Duration::from_secs(5), policy, 0.3).unwrap()
    }

    #[tokio::test]
    async fn test_change_from_last_two_closes() {
        // 2025-10-09 and 2025-10-10 at 13:30 UTC
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": { "regularMarketPrice": 102.0, "chartPreviousClose": 90.0 },
                    "timestamp": [1760016600, 1760103000],
                    "indicators": { "quote": [{ "close": [100.0, 102.0] }] }
                }]
            }
        }"#;
        let mock_server = create_mock_server("AAPL", mock_response).await;

        let quote = provider(&mock_server.uri())
            .fetch_quote("AAPL")
            .await
            .unwrap();
        assert_eq!(quote.ticker, "AAPL");
        assert!((quote.change_percent - 2.0).abs() < 1e-9);
        assert_eq!(quote.direction, Direction::Up);
        assert_eq!(
            quote.last_trading_day,
            NaiveDate::from_ymd_opt(2025, 10, 10)
        );
    }

    #[tokio::test]
    async fn test_small_move_is_flat_and_nulls_are_skipped() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {},
                    "timestamp": [1760016600, 1760103000, 1760189400],
                    "indicators": { "quote": [{ "close": [200.0, 199.6, null] }] }
                }]
            }
        }"#;
        let mock_server = create_mock_server("MSFT", mock_response).await;

        let quote = provider(&mock_server.uri())
            .fetch_quote("MSFT")
            .await
            .unwrap();
        assert!((quote.change_percent + 0.2).abs() < 1e-9);
        assert_eq!(quote.direction, Direction::Flat);
    }

    #[tokio::test]
    async fn test_single_close_uses_chart_previous_close() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": { "chartPreviousClose": 50.0 },
                    "timestamp": [1760103000],
                    "indicators": { "quote": [{ "close": [45.0] }] }
                }]
            }
        }"#;
        let mock_server = create_mock_server("TSLA", mock_response).await;

        let quote = provider(&mock_server.uri())
            .fetch_quote("TSLA")
            .await
            .unwrap();
        assert!((quote.change_percent + 10.0).abs() < 1e-9);
        assert_eq!(quote.direction, Direction::Down);
    }

    #[tokio::test]
    async fn test_no_price_result_data() {
        let mock_response = r#"{"chart": {"result": []}}"#;
        let mock_server = create_mock_server("INVALID", mock_response).await;

        let result = provider(&mock_server.uri()).fetch_quote("INVALID").await;
        assert_eq!(
            result.unwrap_err(),
            BriefingError::PriceUnavailable {
                ticker: "INVALID".to_string(),
                reason: "No price data found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_then_reported() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NVDA"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri()).fetch_quote("NVDA").await;
        assert!(matches!(
            result,
            Err(BriefingError::PriceUnavailable { ref ticker, .. }) if ticker == "NVDA"
        ));
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NOPE"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = provider(&mock_server.uri()).fetch_quote("NOPE").await;
        assert!(result.is_err());
    }
}
