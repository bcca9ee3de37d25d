use crate::core::config::ProvidersConfig;
use crate::core::deadline::Deadline;
use crate::core::error::BriefingError;
use crate::core::news::{NewsItem, NewsQuery, NewsSource};
use crate::core::text::{collapse_whitespace, strip_html};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Reads one source for one query. Fails with `FetchTimeout` or
    /// `FetchError`; never affects other sources.
    async fn fetch(
        &self,
        source: NewsSource,
        query: &NewsQuery,
    ) -> Result<Vec<NewsItem>, BriefingError>;
}

#[derive(Deserialize, Debug)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Deserialize, Debug)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Deserialize, Debug)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses an RSS 2.0 document. Entries without a title or a readable
/// `pubDate` are skipped.
pub fn parse_feed(source: NewsSource, xml: &str, max_items: usize) -> Result<Vec<NewsItem>> {
    let document: RssDocument =
        quick_xml::de::from_str(xml).map_err(|e| anyhow!("Malformed feed: {}", e))?;

    let items = document
        .channel
        .items
        .into_iter()
        .filter_map(|entry| {
            let title = collapse_whitespace(entry.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                debug!(%source, "Skipping feed entry without title");
                return None;
            }
            let Some(published_at) = entry.pub_date.as_deref().and_then(parse_pub_date) else {
                debug!(%source, %title, "Skipping feed entry without a valid pubDate");
                return None;
            };
            let link = entry
                .link
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty());
            let raw_summary = collapse_whitespace(&strip_html(
                entry.description.as_deref().unwrap_or_default(),
            ));
            Some(NewsItem {
                title,
                link,
                source,
                published_at,
                raw_summary,
            })
        })
        .take(max_items)
        .collect();

    Ok(items)
}

/// Fetches Google News, Yahoo Finance and Bing News RSS feeds.
pub struct RssFeedFetcher {
    client: reqwest::Client,
    google_news_url: String,
    yahoo_url: String,
    bing_url: String,
    timeout: Duration,
    max_items: usize,
}

impl RssFeedFetcher {
    pub fn new(providers: &ProvidersConfig, timeout: Duration, max_items: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("tickerbrief/0.1")
            .build()?;
        Ok(Self {
            client,
            google_news_url: providers.google_news.base_url.clone(),
            yahoo_url: providers.yahoo_rss.base_url.clone(),
            bing_url: providers.bing.base_url.clone(),
            timeout,
            max_items,
        })
    }

    /// Google and Bing are searched by company name, Yahoo by ticker.
    pub fn feed_url(&self, source: NewsSource, query: &NewsQuery) -> String {
        let search = urlencoding::encode(&format!("{} stock", query.name)).into_owned();
        match source {
            NewsSource::GoogleNews => {
                format!("{}/rss/search?q={}", self.google_news_url, search)
            }
            NewsSource::Yahoo => format!(
                "{}/rss/2.0/headline?s={}&region=US&lang=en-US",
                self.yahoo_url,
                urlencoding::encode(&query.ticker)
            ),
            NewsSource::Bing => {
                format!("{}/news/search?q={}&format=rss", self.bing_url, search)
            }
        }
    }

    async fn download(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SourceFetcher for RssFeedFetcher {
    #[instrument(
        name = "FeedFetch",
        skip(self, source, query),
        fields(source = %source, ticker = %query.ticker)
    )]
    async fn fetch(
        &self,
        source: NewsSource,
        query: &NewsQuery,
    ) -> Result<Vec<NewsItem>, BriefingError> {
        let url = self.feed_url(source, query);
        debug!("Requesting feed from {}", url);

        let body = match tokio::time::timeout(self.timeout, self.download(&url)).await {
            Err(_) => {
                return Err(BriefingError::FetchTimeout {
                    feed: source,
                    query: query.ticker.clone(),
                });
            }
            Ok(Err(e)) => {
                return Err(BriefingError::FetchError {
                    feed: source,
                    message: e.to_string(),
                });
            }
            Ok(Ok(body)) => body,
        };

        let items =
            parse_feed(source, &body, self.max_items).map_err(|e| BriefingError::FetchError {
                feed: source,
                message: e.to_string(),
            })?;
        debug!("Fetched {} items", items.len());
        Ok(items)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub source: NewsSource,
    pub error: BriefingError,
}

/// Items and failures gathered from all sources for one query.
#[derive(Debug, Default)]
pub struct SourcesOutcome {
    pub items: Vec<NewsItem>,
    pub succeeded: Vec<NewsSource>,
    pub failures: Vec<SourceFailure>,
    /// Sources still in flight when the deadline passed
    pub cancelled: Vec<NewsSource>,
}

/// Queries every source concurrently and joins the results. A failing source
/// only adds to `failures`; the remaining sources still contribute items.
pub async fn fetch_from_sources(
    fetcher: &dyn SourceFetcher,
    query: &NewsQuery,
    sources: &[NewsSource],
    deadline: &Deadline,
) -> SourcesOutcome {
    let fetches = sources.iter().map(|&source| async move {
        (source, deadline.run(fetcher.fetch(source, query)).await)
    });

    let mut outcome = SourcesOutcome::default();
    for (source, result) in join_all(fetches).await {
        match result {
            Some(Ok(items)) => {
                outcome.items.extend(items);
                outcome.succeeded.push(source);
            }
            Some(Err(error)) => {
                warn!(ticker = %query.ticker, %source, error = %error, "News source failed");
                outcome.failures.push(SourceFailure { source, error });
            }
            None => {
                debug!(ticker = %query.ticker, %source, "News fetch cancelled by deadline");
                outcome.cancelled.push(source);
            }
        }
    }
    outcome
}
