//! Pricing abstractions and core types

use crate::core::error::BriefingError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    /// Classifies a percent change; anything within `flat_threshold` of zero is flat.
    pub fn from_change(change_percent: f64, flat_threshold: f64) -> Self {
        if change_percent > flat_threshold {
            Direction::Up
        } else if change_percent < -flat_threshold {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Direction::Up => "🟢",
            Direction::Flat => "🟡",
            Direction::Down => "🔴",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Direction::Up => "up",
                Direction::Down => "down",
                Direction::Flat => "flat",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub ticker: String,
    pub change_percent: f64,
    pub direction: Direction,
    pub last_trading_day: Option<NaiveDate>,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Latest change against the previous close. A missing ticker yields
    /// [`BriefingError::PriceUnavailable`].
    async fn fetch_quote(&self, ticker: &str) -> Result<PriceQuote, BriefingError>;
}
