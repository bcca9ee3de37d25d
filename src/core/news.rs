//! News item types shared by the fetchers, the deduplicator and the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// A feed source. Declaration order is the dedup priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum NewsSource {
    GoogleNews,
    Yahoo,
    Bing,
}

impl NewsSource {
    pub const ALL: [NewsSource; 3] = [NewsSource::GoogleNews, NewsSource::Yahoo, NewsSource::Bing];
}

impl Display for NewsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                NewsSource::GoogleNews => "GoogleNews",
                NewsSource::Yahoo => "Yahoo",
                NewsSource::Bing => "Bing",
            }
        )
    }
}

/// What to search news for: the ticker plus the company name used as search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    pub ticker: String,
    pub name: String,
}

impl NewsQuery {
    pub fn new(ticker: &str, name: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: Option<String>,
    pub source: NewsSource,
    pub published_at: DateTime<Utc>,
    pub raw_summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Reads a sentiment label out of free text. Matches the German stems as
    /// well, so "Positiv" and "positive" both count.
    pub fn from_label(text: &str) -> Option<Sentiment> {
        let lowered = text.trim().to_lowercase();
        if lowered.contains("positiv") {
            Some(Sentiment::Positive)
        } else if lowered.contains("negativ") {
            Some(Sentiment::Negative)
        } else if lowered.contains("neutral") {
            Some(Sentiment::Neutral)
        } else {
            None
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Sentiment::Positive => "🟢",
            Sentiment::Neutral => "🟡",
            Sentiment::Negative => "🔴",
        }
    }
}

impl Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Sentiment::Positive => "positive",
                Sentiment::Neutral => "neutral",
                Sentiment::Negative => "negative",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedItem {
    #[serde(flatten)]
    pub item: NewsItem,
    pub summary: String,
    pub sentiment: Sentiment,
}
