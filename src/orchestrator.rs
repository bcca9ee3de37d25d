//! Drives one briefing run from price lookup to the assembled record.
//!
//! States advance strictly in order:
//! `Idle → FetchingPrices → FetchingNews → Enriching → BuildingOverview → Assembled`.
//! The run deadline starts with `FetchingNews`; once it passes, the run jumps
//! straight to `Assembled` with whatever finished in time. `Failed` is only
//! reached when no portfolio price could be read or no news source answered.

use crate::core::cache::CacheStore;
use crate::core::completion::CompletionBackend;
use crate::core::config::{AppConfig, Instrument};
use crate::core::deadline::Deadline;
use crate::core::error::BriefingError;
use crate::core::news::{EnrichedItem, NewsItem, NewsQuery, NewsSource};
use crate::core::price::{PriceProvider, PriceQuote};
use crate::dedup::deduplicate;
use crate::enrichment::client::EnrichmentClient;
use crate::enrichment::overview::MarketOverview;
use crate::enrichment::pipeline::EnrichmentPipeline;
use crate::enrichment::prompts::overview_input;
use crate::providers;
use crate::providers::feeds::{SourceFetcher, fetch_from_sources};
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BriefingState {
    Idle,
    FetchingPrices,
    FetchingNews,
    Enriching,
    BuildingOverview,
    Assembled,
    Failed,
}

impl Display for BriefingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFailureRecord {
    pub ticker: String,
    pub source: NewsSource,
    pub reason: String,
}

/// Everything one run produced. Read-only once assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefingRecord {
    pub date: NaiveDate,
    pub portfolio_quotes: Vec<PriceQuote>,
    pub watchlist_quotes: Vec<PriceQuote>,
    pub portfolio_news: BTreeMap<String, Vec<EnrichedItem>>,
    pub market_overview: MarketOverview,
    /// Some data is missing because of a failure or the deadline
    pub degraded: bool,
    pub source_failures: Vec<SourceFailureRecord>,
    pub price_gaps: Vec<String>,
    pub dropped_items: usize,
}

/// Data gathered so far; turned into a [`BriefingRecord`] on assembly.
#[derive(Default)]
struct Draft {
    portfolio_quotes: Vec<PriceQuote>,
    watchlist_quotes: Vec<PriceQuote>,
    fetched_news: BTreeMap<String, Vec<NewsItem>>,
    portfolio_news: BTreeMap<String, Vec<EnrichedItem>>,
    market_overview: Option<MarketOverview>,
    degraded: bool,
    source_failures: Vec<SourceFailureRecord>,
    price_gaps: Vec<String>,
    dropped_items: usize,
}

pub struct BriefingOrchestrator {
    prices: Arc<dyn PriceProvider>,
    fetcher: Arc<dyn SourceFetcher>,
    pipeline: EnrichmentPipeline,
    portfolio: Vec<Instrument>,
    watchlist: Vec<Instrument>,
    sources: Vec<NewsSource>,
    deadline_budget: Duration,
    state: BriefingState,
    history: Vec<BriefingState>,
}

impl BriefingOrchestrator {
    pub fn new(
        prices: Arc<dyn PriceProvider>,
        fetcher: Arc<dyn SourceFetcher>,
        pipeline: EnrichmentPipeline,
        portfolio: Vec<Instrument>,
        watchlist: Vec<Instrument>,
        deadline_budget: Duration,
    ) -> Self {
        Self {
            prices,
            fetcher,
            pipeline,
            portfolio,
            watchlist,
            sources: NewsSource::ALL.to_vec(),
            deadline_budget,
            state: BriefingState::Idle,
            history: vec![BriefingState::Idle],
        }
    }

    /// Wires the HTTP providers and the enrichment pipeline from the config.
    pub fn from_config(
        config: &AppConfig,
        cache: Arc<dyn CacheStore>,
        backend: Arc<dyn CompletionBackend>,
    ) -> anyhow::Result<Self> {
        let client = EnrichmentClient::from_config(backend, &config.enrichment);
        let pipeline =
            EnrichmentPipeline::new(Arc::new(client), cache, config.enrichment.cache_ttl());
        Ok(Self::new(
            Arc::new(providers::price_provider(config)?),
            Arc::new(providers::feed_fetcher(config)?),
            pipeline,
            config.portfolio.clone(),
            config.watchlist.clone(),
            config.briefing.deadline(),
        ))
    }

    pub fn state(&self) -> BriefingState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`.
    pub fn history(&self) -> &[BriefingState] {
        &self.history
    }

    fn transition(&mut self, next: BriefingState) {
        info!(from = %self.state, to = %next, "Briefing state change");
        self.state = next;
        self.history.push(next);
    }

    fn fail(&mut self, error: BriefingError) -> BriefingError {
        warn!(error = %error, "Briefing failed");
        self.transition(BriefingState::Failed);
        error
    }

    pub async fn run(&mut self) -> Result<BriefingRecord, BriefingError> {
        let mut draft = Draft::default();

        self.transition(BriefingState::FetchingPrices);
        self.fetch_prices(&mut draft).await;
        if draft.portfolio_quotes.is_empty() {
            return Err(self.fail(BriefingError::AllPricesUnavailable));
        }

        let deadline = Deadline::after(self.deadline_budget);

        self.transition(BriefingState::FetchingNews);
        let reached_any_source = self.fetch_news(&mut draft, &deadline).await;
        if !reached_any_source {
            return Err(self.fail(BriefingError::NoSourceReachable));
        }
        if self.deadline_passed(&deadline, &mut draft) {
            return Ok(self.assemble(draft));
        }

        self.transition(BriefingState::Enriching);
        self.enrich_news(&mut draft, &deadline).await;
        if self.deadline_passed(&deadline, &mut draft) {
            return Ok(self.assemble(draft));
        }

        self.transition(BriefingState::BuildingOverview);
        self.build_overview(&mut draft, &deadline).await;
        self.deadline_passed(&deadline, &mut draft);

        Ok(self.assemble(draft))
    }

    fn deadline_passed(&self, deadline: &Deadline, draft: &mut Draft) -> bool {
        if deadline.is_expired() {
            let error = BriefingError::DeadlineExceeded {
                stage: self.state.to_string(),
            };
            warn!(error = %error, "Assembling partial briefing");
            draft.degraded = true;
            return true;
        }
        false
    }

    async fn fetch_quotes(
        &self,
        instruments: &[Instrument],
    ) -> Vec<Result<PriceQuote, BriefingError>> {
        join_all(
            instruments
                .iter()
                .map(|instrument| self.prices.fetch_quote(&instrument.ticker)),
        )
        .await
    }

    async fn fetch_prices(&self, draft: &mut Draft) {
        let (portfolio, watchlist) = futures::join!(
            self.fetch_quotes(&self.portfolio),
            self.fetch_quotes(&self.watchlist)
        );

        let results = portfolio
            .into_iter()
            .map(|r| (true, r))
            .chain(watchlist.into_iter().map(|r| (false, r)));
        let instruments = self.portfolio.iter().chain(&self.watchlist);

        for (instrument, (in_portfolio, result)) in instruments.zip(results) {
            match result {
                Ok(quote) if in_portfolio => draft.portfolio_quotes.push(quote),
                Ok(quote) => draft.watchlist_quotes.push(quote),
                Err(error) => {
                    warn!(ticker = %instrument.ticker, error = %error, "Price gap");
                    draft.price_gaps.push(instrument.ticker.clone());
                    draft.degraded = true;
                }
            }
        }
    }

    /// Returns false when every fetch failed outright. Fetches cut short by
    /// the deadline do not count as failures.
    async fn fetch_news(&self, draft: &mut Draft, deadline: &Deadline) -> bool {
        let fetcher = self.fetcher.as_ref();
        let outcomes = join_all(self.portfolio.iter().map(|instrument| async move {
            let query = NewsQuery::new(&instrument.ticker, &instrument.name);
            let outcome = fetch_from_sources(fetcher, &query, &self.sources, deadline).await;
            (instrument.ticker.clone(), outcome)
        }))
        .await;

        let mut answered = false;
        for (ticker, outcome) in outcomes {
            answered |= !outcome.succeeded.is_empty() || !outcome.cancelled.is_empty();
            if !outcome.failures.is_empty() || !outcome.cancelled.is_empty() {
                draft.degraded = true;
            }
            draft
                .source_failures
                .extend(outcome.failures.into_iter().map(|f| SourceFailureRecord {
                    ticker: ticker.clone(),
                    source: f.source,
                    reason: f.error.to_string(),
                }));

            let items = deduplicate(outcome.items);
            debug!(%ticker, count = items.len(), "Deduplicated news");
            draft.fetched_news.insert(ticker, items);
        }
        answered
    }

    async fn enrich_news(&self, draft: &mut Draft, deadline: &Deadline) {
        let fetched = std::mem::take(&mut draft.fetched_news);
        let outcomes = self.pipeline.enrich_grouped(fetched, deadline).await;

        for (ticker, outcome) in outcomes {
            if outcome.dropped > 0 || outcome.cancelled > 0 {
                draft.degraded = true;
            }
            draft.dropped_items += outcome.dropped;
            draft.portfolio_news.insert(ticker, outcome.items);
        }
    }

    async fn build_overview(&self, draft: &mut Draft, deadline: &Deadline) {
        let input = overview_input(&draft.portfolio_quotes, &draft.portfolio_news);
        match self.pipeline.market_overview(input, deadline).await {
            Some(Ok(overview)) => draft.market_overview = Some(overview),
            Some(Err(error)) => {
                warn!(error = %error, "Market overview unavailable");
                draft.degraded = true;
            }
            None => debug!("Market overview cut short by deadline"),
        }
    }

    fn assemble(&mut self, draft: Draft) -> BriefingRecord {
        let date = draft
            .portfolio_quotes
            .iter()
            .chain(&draft.watchlist_quotes)
            .filter_map(|q| q.last_trading_day)
            .max()
            .unwrap_or_else(|| Utc::now().date_naive());

        let market_overview = draft
            .market_overview
            .unwrap_or_else(MarketOverview::placeholder);
        let degraded = draft.degraded || market_overview.is_placeholder();

        self.transition(BriefingState::Assembled);
        BriefingRecord {
            date,
            portfolio_quotes: draft.portfolio_quotes,
            watchlist_quotes: draft.watchlist_quotes,
            portfolio_news: draft.portfolio_news,
            market_overview,
            degraded,
            source_failures: draft.source_failures,
            price_gaps: draft.price_gaps,
            dropped_items: draft.dropped_items,
        }
    }
}
