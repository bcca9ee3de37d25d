use crate::core::price::Direction;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub enum StyleType {
    Title,
    Warning,
    Error,
    Subtle,
}

pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Warning => style(text).yellow(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Rounded table with a bold cyan header row.
pub fn new_styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|text| Cell::new(text).fg(Color::Cyan).add_attribute(Attribute::Bold))
                .collect::<Vec<Cell>>(),
        );
    table
}

/// Percentage change colored by its direction.
pub fn change_cell(change: f64, direction: Direction) -> Cell {
    let color = match direction {
        Direction::Up => Color::Green,
        Direction::Down => Color::Red,
        Direction::Flat => Color::Yellow,
    };
    Cell::new(format!("{change:+.2}%"))
        .fg(color)
        .set_alignment(CellAlignment::Right)
}

/// Placeholder for a ticker without a quote.
pub fn gap_cell() -> Cell {
    Cell::new("N/A")
        .fg(Color::Red)
        .set_alignment(CellAlignment::Right)
}

/// Bar for fan-outs with a known number of requests.
pub fn new_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Spinner for work without a known length.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Full-width rule, 80 columns when stdout is not a terminal.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}
