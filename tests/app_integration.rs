use std::fs;
use std::sync::Arc;
use tickerbrief::core::cache::CacheStore;
use tickerbrief::core::config::AppConfig;
use tickerbrief::core::error::BriefingError;
use tickerbrief::core::news::{NewsSource, Sentiment};
use tickerbrief::orchestrator::{BriefingOrchestrator, BriefingState};
use tickerbrief::output::{Archiver, JsonlArchiver, MarkdownRenderer, Renderer};
use tickerbrief::providers::openai::OpenAiBackend;
use tickerbrief::store::memory::MemoryCacheStore;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const CHART: &str = r#"{
        "chart": {
            "result": [{
                "meta": { "regularMarketPrice": 102.0, "chartPreviousClose": 99.0 },
                "timestamp": [1760016600, 1760103000],
                "indicators": { "quote": [{ "close": [100.0, 102.0] }] }
            }]
        }
    }"#;

    pub fn feed(items: &[(&str, &str)]) -> String {
        let entries: String = items
            .iter()
            .map(|(title, link)| {
                format!(
                    "<item><title>{title}</title><link>{link}</link>\
                     <pubDate>Fri, 10 Oct 2025 09:00:00 GMT</pubDate>\
                     <description>{title} in detail</description></item>"
                )
            })
            .collect();
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel>{entries}</channel></rss>"#)
    }

    fn completion(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        }))
    }

    /// One server standing in for prices, all three feeds and the completion service.
    /// Bing always fails.
    pub async fn create_mock_server() -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CHART))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/NVDA"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rss/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed(&[
                ("Apple beats estimates", "https://example.com/apple-q4"),
                ("Apple expands services", "https://example.com/services"),
            ])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rss/2.0/headline"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed(&[
                (
                    "Apple beats estimates",
                    "https://www.example.com/apple-q4?utm_source=yahoo",
                ),
                ("Apple supplier update", "https://example.com/supplier"),
            ])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news/search"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("x-prompt-id", "summary@v1"))
            .respond_with(completion("Apple reported strong results."))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("x-prompt-id", "sentiment@v1"))
            .respond_with(completion("positive"))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("x-prompt-id", "overview@v1"))
            .respond_with(completion(
                "**Macro:** Markets steady.\n**Portfolio:** Apple led.\n**Conclusion:** 🟢 good day",
            ))
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub async fn completion_calls(mock_server: &MockServer) -> usize {
        mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/chat/completions")
            .count()
    }
}

fn config_for(uri: &str, data_path: &std::path::Path) -> String {
    format!(
        r#"
portfolio:
  - ticker: "AAPL"
    name: "Apple"
watchlist:
  - ticker: "NVDA"
    name: "Nvidia"
providers:
  yahoo:
    base_url: "{uri}"
  yahoo_rss:
    base_url: "{uri}"
  google_news:
    base_url: "{uri}"
  bing:
    base_url: "{uri}"
enrichment:
  base_url: "{uri}"
  max_retries: 1
  backoff_base_ms: 1
  backoff_max_ms: 2
briefing:
  deadline_secs: 30
  fetch_timeout_secs: 5
cache:
  persist: false
data_path: "{}"
"#,
        data_path.display()
    )
}

#[test_log::test(tokio::test)]
async fn test_full_briefing_flow_with_mock() {
    let mock_server = test_utils::create_mock_server().await;
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let config: AppConfig =
        serde_yaml::from_str(&config_for(&mock_server.uri(), temp_dir.path())).unwrap();

    let cache: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let backend =
        Arc::new(OpenAiBackend::new(&mock_server.uri(), "test-model", "test-key").unwrap());
    let mut orchestrator =
        BriefingOrchestrator::from_config(&config, cache.clone(), backend.clone()).unwrap();

    let record = orchestrator.run().await.expect("Briefing run failed");
    info!(?record, "Assembled briefing");

    assert_eq!(orchestrator.state(), BriefingState::Assembled);
    assert_eq!(record.date.to_string(), "2025-10-10");
    assert_eq!(record.portfolio_quotes.len(), 1);
    assert!((record.portfolio_quotes[0].change_percent - 2.0).abs() < 1e-9);
    assert_eq!(record.price_gaps, vec!["NVDA".to_string()]);

    let news = &record.portfolio_news["AAPL"];
    assert_eq!(news.len(), 3);
    assert_eq!(news[0].item.source, NewsSource::GoogleNews);
    assert!(news.iter().all(|e| e.sentiment == Sentiment::Positive));
    assert_eq!(news[0].summary, "Apple reported strong results.");

    assert_eq!(record.source_failures.len(), 1);
    assert_eq!(record.source_failures[0].source, NewsSource::Bing);
    assert!(record.degraded);

    assert_eq!(record.market_overview.macro_view, "Markets steady.");
    assert_eq!(record.market_overview.conclusion, Sentiment::Positive);

    // 3 summaries, 1 classification of the summary they share, 1 overview
    let first_calls = test_utils::completion_calls(&mock_server).await;
    assert_eq!(first_calls, 5);

    let rendered = MarkdownRenderer.render(&record);
    assert!(rendered.contains("### AAPL"));
    let archived = JsonlArchiver::new(temp_dir.path().join("archive"))
        .archive(&record)
        .unwrap();
    assert!(fs::read_to_string(archived).unwrap().contains("\"AAPL\""));

    // Same input within the ttl: everything comes from the cache.
    let mut second =
        BriefingOrchestrator::from_config(&config, cache.clone(), backend.clone()).unwrap();
    let repeat = second.run().await.expect("Second briefing run failed");
    assert_eq!(test_utils::completion_calls(&mock_server).await, first_calls);
    assert_eq!(repeat.portfolio_news, record.portfolio_news);
}

#[test_log::test(tokio::test)]
async fn test_run_fails_without_portfolio_prices() {
    let mock_server = test_utils::create_mock_server().await;
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let mut config: AppConfig =
        serde_yaml::from_str(&config_for(&mock_server.uri(), temp_dir.path())).unwrap();
    config.portfolio[0].ticker = "NVDA".to_string();

    let backend = Arc::new(OpenAiBackend::new(&mock_server.uri(), "m", "k").unwrap());
    let mut orchestrator =
        BriefingOrchestrator::from_config(&config, Arc::new(MemoryCacheStore::new()), backend)
            .unwrap();

    let err = orchestrator.run().await.unwrap_err();
    assert_eq!(err, BriefingError::AllPricesUnavailable);
    assert_eq!(orchestrator.state(), BriefingState::Failed);
    assert_eq!(test_utils::completion_calls(&mock_server).await, 0);
}

#[test_log::test(tokio::test)]
async fn test_prices_command_with_mock() {
    let mock_server = test_utils::create_mock_server().await;
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_path = config_file.path();
    fs::write(config_path, config_for(&mock_server.uri(), temp_dir.path()))
        .expect("Failed to write config file");

    let result = tickerbrief::run_command(
        tickerbrief::AppCommand::Prices,
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Prices command failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_cache_purge_command() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_path = config_file.path();
    let config_content = format!(
        r#"
portfolio:
  - ticker: "AAPL"
    name: "Apple"
data_path: "{}"
"#,
        temp_dir.path().display()
    );
    fs::write(config_path, config_content).expect("Failed to write config file");

    let result = tickerbrief::run_command(
        tickerbrief::AppCommand::CachePurge,
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Cache purge failed with: {:?}",
        result.err()
    );
    assert!(temp_dir.path().join("cache").exists());
}

#[test_log::test(tokio::test)]
async fn test_invalid_config_is_rejected() {
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    fs::write(config_file.path(), "portfolio: []\n").expect("Failed to write config file");

    let result = tickerbrief::run_command(
        tickerbrief::AppCommand::Prices,
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("portfolio must contain at least one instrument"));
}
