use super::ui;
use crate::core::config::{AppConfig, Instrument};
use crate::core::error::BriefingError;
use crate::core::price::{PriceProvider, PriceQuote};
use crate::providers;
use anyhow::Result;
use comfy_table::{Cell, Table};
use futures::future::join_all;

type QuoteRow<'a> = (&'a Instrument, Result<PriceQuote, BriefingError>);

fn quotes_table(rows: &[QuoteRow<'_>]) -> Table {
    let mut table =
        ui::new_styled_table(&["Ticker", "Name", "Change", "Trend", "Trading day"]);

    for (instrument, result) in rows {
        let mut row = vec![Cell::new(&instrument.ticker), Cell::new(&instrument.name)];
        match result {
            Ok(quote) => {
                row.push(ui::change_cell(quote.change_percent, quote.direction));
                row.push(Cell::new(quote.direction.marker()));
                row.push(Cell::new(
                    quote
                        .last_trading_day
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                ));
            }
            Err(_) => {
                row.push(ui::gap_cell());
                row.push(Cell::new(""));
                row.push(Cell::new(""));
            }
        }
        table.add_row(row);
    }
    table
}

async fn fetch_rows<'a>(
    instruments: &'a [Instrument],
    provider: &dyn PriceProvider,
) -> Vec<QuoteRow<'a>> {
    let pb = ui::new_progress_bar(instruments.len() as u64);
    let futures = instruments.iter().map(|instrument| {
        let pb_clone = pb.clone();
        async move {
            let result = provider.fetch_quote(&instrument.ticker).await;
            pb_clone.inc(1);
            (instrument, result)
        }
    });
    let rows = join_all(futures).await;
    pb.finish_and_clear();
    rows
}

/// Prints daily price changes for the portfolio and the watchlist.
pub async fn run(config: &AppConfig) -> Result<()> {
    let provider = providers::price_provider(config)?;

    for (title, instruments) in [
        ("Portfolio", &config.portfolio),
        ("Watchlist", &config.watchlist),
    ] {
        if instruments.is_empty() {
            continue;
        }
        let rows = fetch_rows(instruments, &provider).await;
        println!("\n{}", ui::style_text(title, ui::StyleType::Title));
        println!("{}", quotes_table(&rows));

        for (instrument, result) in &rows {
            if let Err(e) = result {
                println!(
                    "{}",
                    ui::style_text(
                        &format!("{}: {}", instrument.ticker, e),
                        ui::StyleType::Error
                    )
                );
            }
        }
    }
    Ok(())
}
