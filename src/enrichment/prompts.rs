//! Instructions for each enrichment stage and the input they are applied to.
//!
//! Changing any instruction text here requires bumping `prompt_version` in
//! the config, otherwise cached answers for the old wording are reused.

use crate::core::cache::Stage;
use crate::core::news::{EnrichedItem, NewsItem};
use crate::core::price::PriceQuote;
use crate::core::text::clean_text;
use std::collections::BTreeMap;
use std::fmt::Write;

const SUMMARY: &str = "You are a financial news editor. Summarize the article in at most two \
plain sentences for a private investor. State facts only, no advice, no ticker symbols.";

const SENTIMENT: &str = "Classify the likely effect of this news summary on the company's \
share price. Answer with exactly one word: positive, neutral or negative.";

const OVERVIEW: &str = "You write the closing section of a daily portfolio briefing. Using the \
price moves and news summaries below, answer in exactly three lines:\n\
Macro: one or two sentences on the overall market backdrop.\n\
Portfolio: one or two sentences assessing the portfolio today.\n\
Conclusion: positive, neutral or negative, followed by a short reason.";

/// Identifier sent with every request, e.g. `summary@v1`.
pub fn prompt_id(stage: Stage, version: &str) -> String {
    format!("{stage}@{version}")
}

pub fn instructions(stage: Stage) -> &'static str {
    match stage {
        Stage::Summary => SUMMARY,
        Stage::Sentiment => SENTIMENT,
        Stage::Overview => OVERVIEW,
    }
}

pub fn summary_input(item: &NewsItem) -> String {
    let body = clean_text(&item.raw_summary);
    if body.is_empty() {
        clean_text(&item.title)
    } else {
        format!("{}\n\n{}", clean_text(&item.title), body)
    }
}

/// Price line plus every summary, grouped by ticker in ticker order.
pub fn overview_input(
    quotes: &[PriceQuote],
    news: &BTreeMap<String, Vec<EnrichedItem>>,
) -> String {
    let mut input = String::from("Price moves:\n");
    for quote in quotes {
        let _ = writeln!(
            input,
            "- {}: {:+.2}% ({})",
            quote.ticker, quote.change_percent, quote.direction
        );
    }
    input.push_str("\nNews:\n");
    for (ticker, items) in news {
        for enriched in items {
            let _ = writeln!(
                input,
                "- [{}] {} ({})",
                ticker, enriched.summary, enriched.sentiment
            );
        }
    }
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::news::{NewsSource, Sentiment};
    use crate::core::price::Direction;
    use chrono::Utc;

    fn item(title: &str, raw: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            link: None,
            source: NewsSource::Yahoo,
            published_at: Utc::now(),
            raw_summary: raw.to_string(),
        }
    }

    #[test]
    fn test_prompt_id_carries_version() {
        assert_eq!(prompt_id(Stage::Summary, "v1"), "summary@v1");
        assert_eq!(prompt_id(Stage::Overview, "2025-10"), "overview@2025-10");
    }

    #[test]
    fn test_summary_input_is_cleaned() {
        let input = summary_input(&item(
            "Apple (NASDAQ:AAPL) beats",
            "<b>Record</b> quarter. Subscribe to our newsletter today",
        ));
        assert_eq!(input, "Apple beats\n\nRecord quarter.");
    }

    #[test]
    fn test_summary_input_without_body_uses_title() {
        assert_eq!(summary_input(&item("Apple beats", "  ")), "Apple beats");
    }

    #[test]
    fn test_overview_input_lists_prices_and_news() {
        let quotes = vec![PriceQuote {
            ticker: "AAPL".to_string(),
            change_percent: 1.234,
            direction: Direction::Up,
            last_trading_day: None,
        }];
        let mut news = BTreeMap::new();
        news.insert(
            "AAPL".to_string(),
            vec![EnrichedItem {
                item: item("t", ""),
                summary: "Apple did well.".to_string(),
                sentiment: Sentiment::Positive,
            }],
        );

        let input = overview_input(&quotes, &news);
        assert!(input.contains("- AAPL: +1.23% (up)"));
        assert!(input.contains("- [AAPL] Apple did well. (positive)"));
    }
}
