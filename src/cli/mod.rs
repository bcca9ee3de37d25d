pub mod briefing;
pub mod cache;
pub mod prices;
pub mod setup;
pub mod ui;
