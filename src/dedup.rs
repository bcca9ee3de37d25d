//! Merges the items every source returned for one ticker into a single
//! duplicate-free, reverse-chronological sequence.
//!
//! Two items are duplicates when their normalized links match, or, for items
//! without a usable link, when their normalized titles match. Paraphrased
//! copies of the same story are not detected.

use crate::core::news::NewsItem;
use crate::core::text::{normalize_link, normalize_text};
use std::collections::HashSet;

/// Normalized link when it parses, the trimmed raw link when it does not,
/// and the normalized title only for items without a link.
pub fn dedup_key(item: &NewsItem) -> String {
    let link = item.link.as_deref().map(str::trim).filter(|l| !l.is_empty());
    match link {
        Some(raw) => match normalize_link(raw) {
            Some(link) => format!("link:{link}"),
            None => format!("link:{raw}"),
        },
        None => format!("title:{}", normalize_text(&item.title)),
    }
}

/// Keeps the first item per key in source priority order (GoogleNews, Yahoo,
/// Bing), then orders newest first with ties broken by the same priority.
/// The result does not depend on the order in which sources completed.
pub fn deduplicate<I>(items: I) -> Vec<NewsItem>
where
    I: IntoIterator<Item = NewsItem>,
{
    let mut items: Vec<NewsItem> = items.into_iter().collect();
    // Stable, so each source keeps its own feed order.
    items.sort_by_key(|item| item.source);

    let mut seen = HashSet::new();
    let mut unique: Vec<NewsItem> = items
        .into_iter()
        .filter(|item| seen.insert(dedup_key(item)))
        .collect();

    unique.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.source.cmp(&b.source))
    });
    unique
}
