//! The closing market overview and its parser.

use crate::core::news::Sentiment;
use serde::{Deserialize, Serialize};

const PLACEHOLDER: &str = "Not available.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOverview {
    #[serde(rename = "macro")]
    pub macro_view: String,
    pub portfolio_assessment: String,
    pub conclusion: Sentiment,
    /// Free-text reasoning that accompanied the conclusion label
    pub conclusion_text: String,
}

impl MarketOverview {
    /// Stand-in used when the overview could not be produced.
    pub fn placeholder() -> Self {
        Self {
            macro_view: PLACEHOLDER.to_string(),
            portfolio_assessment: PLACEHOLDER.to_string(),
            conclusion: Sentiment::Neutral,
            conclusion_text: String::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self == &Self::placeholder()
    }
}

fn strip_markdown(line: &str) -> String {
    line.replace("**", "")
        .trim_start_matches(['#', '-', '*', ' '])
        .trim()
        .to_string()
}

fn strip_header<'a>(line: &'a str, header: &str) -> Option<&'a str> {
    line.get(..header.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(header))
        .map(|_| &line[header.len()..])
}

fn conclusion_sentiment(text: &str) -> Sentiment {
    if text.contains('🟢') {
        Sentiment::Positive
    } else if text.contains('🔴') {
        Sentiment::Negative
    } else if text.contains('🟡') {
        Sentiment::Neutral
    } else {
        Sentiment::from_label(text).unwrap_or(Sentiment::Neutral)
    }
}

/// Splits the answer into its `Macro:`, `Portfolio:` and `Conclusion:`
/// sections. Lines following a header belong to that section; text before
/// any header counts as macro commentary.
pub fn parse_overview(text: &str) -> MarketOverview {
    #[derive(Clone, Copy)]
    enum Section {
        Macro,
        Portfolio,
        Conclusion,
    }

    let mut macro_lines = Vec::new();
    let mut portfolio_lines = Vec::new();
    let mut conclusion_lines = Vec::new();
    let mut current = Section::Macro;

    for raw in text.lines() {
        let line = strip_markdown(raw);
        if line.is_empty() {
            continue;
        }
        let (section, rest) = if let Some(rest) = strip_header(&line, "macro:") {
            (Section::Macro, rest)
        } else if let Some(rest) = strip_header(&line, "portfolio:") {
            (Section::Portfolio, rest)
        } else if let Some(rest) = strip_header(&line, "conclusion:") {
            (Section::Conclusion, rest)
        } else {
            (current, line.as_str())
        };
        current = section;

        let rest = rest.trim();
        if rest.is_empty() {
            continue;
        }
        match section {
            Section::Macro => macro_lines.push(rest.to_string()),
            Section::Portfolio => portfolio_lines.push(rest.to_string()),
            Section::Conclusion => conclusion_lines.push(rest.to_string()),
        }
    }

    let conclusion_text = conclusion_lines.join(" ");
    MarketOverview {
        macro_view: macro_lines.join(" "),
        portfolio_assessment: portfolio_lines.join(" "),
        conclusion: conclusion_sentiment(&conclusion_text),
        conclusion_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_sections() {
        let overview = parse_overview(
            "**Macro:** Rates steady, indices near highs.\n\
             **Portfolio:** Tech holdings led the gains.\n\
             **Conclusion:** Positive, broad strength.",
        );
        assert_eq!(overview.macro_view, "Rates steady, indices near highs.");
        assert_eq!(overview.portfolio_assessment, "Tech holdings led the gains.");
        assert_eq!(overview.conclusion, Sentiment::Positive);
        assert_eq!(overview.conclusion_text, "Positive, broad strength.");
    }

    #[test]
    fn test_parse_multiline_sections_and_emoji_conclusion() {
        let overview = parse_overview(
            "Macro:\nInflation data surprised.\nYields rose.\n\n\
             Portfolio: Mixed.\nConclusion: 🔴 risk-off day",
        );
        assert_eq!(overview.macro_view, "Inflation data surprised. Yields rose.");
        assert_eq!(overview.portfolio_assessment, "Mixed.");
        assert_eq!(overview.conclusion, Sentiment::Negative);
    }

    #[test]
    fn test_missing_conclusion_defaults_to_neutral() {
        let overview = parse_overview("Markets drifted.");
        assert_eq!(overview.macro_view, "Markets drifted.");
        assert!(overview.portfolio_assessment.is_empty());
        assert_eq!(overview.conclusion, Sentiment::Neutral);
    }

    #[test]
    fn test_placeholder() {
        assert!(MarketOverview::placeholder().is_placeholder());
        assert!(!parse_overview("Macro: x").is_placeholder());
    }
}
