//! Text cleanup applied before anything is sent for enrichment, plus the
//! normalizations the deduplicator keys on.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

const MAX_ENRICHMENT_CHARS: usize = 2000;

const TRACKING_PARAMS: &[&str] = &[
    "gclid", "fbclid", "mc_cid", "mc_eid", "ref", "src", "mkt", "oc", "aid",
];

static TICKER_MENTIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\([A-Z]{2,10}:[A-Z]{2,10}\)", // (NASDAQ:MSFT)
        r"\$[A-Z]{1,10}\b",             // $MSFT
        r"\([A-Z]{2,6}\)",              // (MSFT)
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)subscribe to our newsletter.*",
        r"(?i)sign up to receive.*",
        r"(?i)follow us on.*",
        r"(?i)all rights reserved.*",
        r"(?i)click here to read more.*",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

static HTML_TAGS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());

/// Prepares article text for the enrichment service.
pub fn clean_text(text: &str) -> String {
    let mut cleaned = strip_html(text);
    for re in TICKER_MENTIONS.iter().chain(BOILERPLATE.iter()) {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    let collapsed = collapse_whitespace(&cleaned);
    collapsed.chars().take(MAX_ENRICHMENT_CHARS).collect()
}

pub fn strip_html(text: &str) -> String {
    match HTML_TAGS.as_ref() {
        Some(re) => re.replace_all(text, " ").into_owned(),
        None => text.to_string(),
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercases and replaces everything but letters and digits with single spaces.
pub fn normalize_text(text: &str) -> String {
    let lowered: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_whitespace(&lowered)
}

fn is_tracking_param(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.starts_with("utm_") || TRACKING_PARAMS.contains(&name.as_str())
}

/// Canonical form of an article link: lowercase host without `www.`, no
/// fragment, no trailing slash, tracking parameters dropped and the rest
/// sorted. Returns `None` for blank or unparseable links.
pub fn normalize_link(link: &str) -> Option<String> {
    let trimmed = link.trim();
    if trimmed.is_empty() {
        return None;
    }
    let url = Url::parse(trimmed).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut query: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    query.sort();

    let path = url.path().trim_end_matches('/');
    let port = url.port().map(|p| format!(":{p}")).unwrap_or_default();
    let mut normalized = format!("{}://{}{}{}", url.scheme(), host, port, path);
    if !query.is_empty() {
        let encoded: Vec<String> = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        normalized.push('?');
        normalized.push_str(&encoded.join("&"));
    }
    Some(normalized)
}
