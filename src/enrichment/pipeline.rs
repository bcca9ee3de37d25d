use crate::core::cache::{CacheKey, CacheStore, Stage};
use crate::core::deadline::Deadline;
use crate::core::error::BriefingError;
use crate::core::news::{EnrichedItem, NewsItem, Sentiment};
use crate::dedup::dedup_key;
use crate::enrichment::client::EnrichmentClient;
use crate::enrichment::overview::{MarketOverview, parse_overview};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Result of enriching one ticker's items.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    /// Enriched items in input order
    pub items: Vec<EnrichedItem>,
    /// Items whose summary or classification failed
    pub dropped: usize,
    /// Items still in flight when the deadline passed
    pub cancelled: usize,
}

impl PipelineOutcome {
    fn record(&mut self, result: Option<Result<EnrichedItem, BriefingError>>) {
        match result {
            Some(Ok(enriched)) => self.items.push(enriched),
            Some(Err(_)) => self.dropped += 1,
            None => self.cancelled += 1,
        }
    }
}

/// Cache-or-call enrichment of news items.
///
/// Summaries are cached under the item's dedup identity, sentiments under the
/// summary text, so a repeated run within the ttl never reaches the client.
/// Concurrent misses on one key wait for a single call and then read its
/// result from the cache.
pub struct EnrichmentPipeline {
    client: Arc<EnrichmentClient>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
    in_flight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl EnrichmentPipeline {
    pub fn new(client: Arc<EnrichmentClient>, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            client,
            cache,
            ttl,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub async fn enrich(&self, items: Vec<NewsItem>, deadline: &Deadline) -> PipelineOutcome {
        self.enrich_grouped(BTreeMap::from([((), items)]), deadline)
            .await
            .remove(&())
            .unwrap_or_default()
    }

    /// Enriches several groups (one per ticker) through a single stream, so
    /// at most `max_in_flight` items are in progress across all groups. Every
    /// input group gets an outcome, in input order.
    pub async fn enrich_grouped<K: Ord + Clone>(
        &self,
        groups: BTreeMap<K, Vec<NewsItem>>,
        deadline: &Deadline,
    ) -> BTreeMap<K, PipelineOutcome> {
        let mut outcomes: BTreeMap<K, PipelineOutcome> = groups
            .keys()
            .map(|group| (group.clone(), PipelineOutcome::default()))
            .collect();

        let tagged = groups.into_iter().flat_map(|(group, items)| {
            items.into_iter().map(move |item| (group.clone(), item))
        });
        let results: Vec<(K, Option<Result<EnrichedItem, BriefingError>>)> = stream::iter(tagged)
            .map(|(group, item)| async move { (group, deadline.run(self.enrich_item(item)).await) })
            .buffered(self.client.max_in_flight())
            .collect()
            .await;

        for (group, result) in results {
            if let Some(outcome) = outcomes.get_mut(&group) {
                outcome.record(result);
            }
        }
        outcomes
    }

    async fn enrich_item(&self, item: NewsItem) -> Result<EnrichedItem, BriefingError> {
        let identity = dedup_key(&item);

        let summary = self
            .cached_or_call(Stage::Summary, &identity, || self.client.summarize(&item))
            .await
            .inspect_err(|e| {
                warn!(title = %item.title, error = %e, "Dropping item: summary failed")
            })?;

        let label = self
            .cached_or_call(Stage::Sentiment, &summary, || async {
                self.client.classify(&summary).await.map(|s| s.to_string())
            })
            .await
            .inspect_err(|e| {
                warn!(title = %item.title, error = %e, "Dropping item: classification failed")
            })?;
        let sentiment = Sentiment::from_label(&label).unwrap_or(Sentiment::Neutral);

        Ok(EnrichedItem {
            item,
            summary,
            sentiment,
        })
    }

    /// Builds the market overview from a prepared input. `None` when the
    /// deadline passed first.
    pub async fn market_overview(
        &self,
        input: String,
        deadline: &Deadline,
    ) -> Option<Result<MarketOverview, BriefingError>> {
        let call = self.cached_or_call(Stage::Overview, &input, || {
            self.client.overview(input.clone())
        });
        deadline
            .run(call)
            .await
            .map(|result| result.map(|text| parse_overview(&text)))
    }

    async fn cached_or_call<F, Fut>(
        &self,
        stage: Stage,
        identity: &str,
        call: F,
    ) -> Result<String, BriefingError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, BriefingError>>,
    {
        let key = CacheKey::derive(stage, self.client.prompt_version(), identity);
        if let Some(value) = self.cache.get(&key).await {
            debug!(%key, "Cache hit");
            return Ok(value);
        }

        let gate = self.gate(&key).await;
        let result = {
            let _turn = gate.lock().await;
            match self.cache.get(&key).await {
                Some(value) => {
                    debug!(%key, "Cache filled by a concurrent call");
                    Ok(value)
                }
                None => match call().await {
                    Ok(value) => {
                        self.cache.put(key.clone(), value.clone(), self.ttl).await;
                        Ok(value)
                    }
                    Err(e) => Err(e),
                },
            }
        };
        self.release(&key, gate).await;
        result
    }

    async fn gate(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        self.in_flight
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .clone()
    }

    /// Forgets the gate once nobody else holds or waits on it. A gate left
    /// behind by a cancelled call is removed by the next caller for its key.
    async fn release(&self, key: &CacheKey, gate: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&gate) <= 2 {
            in_flight.remove(key);
        }
    }
}
