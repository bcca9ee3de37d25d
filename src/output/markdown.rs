use super::Renderer;
use crate::core::price::PriceQuote;
use crate::orchestrator::BriefingRecord;
use std::fmt::Write;

/// Renders the daily report as Markdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

fn write_quotes(out: &mut String, title: &str, quotes: &[PriceQuote]) {
    let _ = writeln!(out, "## {title}\n");
    if quotes.is_empty() {
        out.push_str("_No price data._\n\n");
        return;
    }
    for quote in quotes {
        let _ = writeln!(
            out,
            "- {} **{}** {:+.2}%",
            quote.direction.marker(),
            quote.ticker,
            quote.change_percent
        );
    }
    out.push('\n');
}

impl Renderer for MarkdownRenderer {
    fn render(&self, record: &BriefingRecord) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Daily Briefing {}\n", record.date.format("%Y-%m-%d"));

        if record.degraded {
            out.push_str("> ⚠️ Some data could not be retrieved. This briefing is incomplete.\n\n");
        }

        write_quotes(&mut out, "Portfolio", &record.portfolio_quotes);
        write_quotes(&mut out, "Watchlist", &record.watchlist_quotes);
        if !record.price_gaps.is_empty() {
            let _ = writeln!(out, "_No prices for: {}_\n", record.price_gaps.join(", "));
        }

        out.push_str("## News\n\n");
        let mut any_news = false;
        for (ticker, items) in &record.portfolio_news {
            if items.is_empty() {
                continue;
            }
            any_news = true;
            let _ = writeln!(out, "### {ticker}\n");
            for enriched in items {
                let title = match &enriched.item.link {
                    Some(link) => format!("[{}]({})", enriched.item.title, link),
                    None => enriched.item.title.clone(),
                };
                let _ = writeln!(
                    out,
                    "- {} {} ({})\n  {}",
                    enriched.sentiment.marker(),
                    title,
                    enriched.item.source,
                    enriched.summary
                );
            }
            out.push('\n');
        }
        if !any_news {
            out.push_str("_No news._\n\n");
        }

        let overview = &record.market_overview;
        out.push_str("## Market Overview\n\n");
        let _ = writeln!(out, "**Macro:** {}\n", overview.macro_view);
        let _ = writeln!(out, "**Portfolio:** {}\n", overview.portfolio_assessment);
        let _ = write!(
            out,
            "**Conclusion:** {} {}",
            overview.conclusion.marker(),
            overview.conclusion
        );
        if !overview.conclusion_text.is_empty() {
            let _ = write!(out, " ({})", overview.conclusion_text);
        }
        out.push('\n');
        out
    }
}
