//! Domain types, configuration and shared helpers

pub mod cache;
pub mod completion;
pub mod config;
pub mod deadline;
pub mod error;
pub mod log;
pub mod news;
pub mod price;
pub mod retry;
pub mod text;

// Re-export main types for cleaner imports
pub use cache::{CacheKey, CacheStore, Stage};
pub use error::{BriefingError, ServiceError};
pub use news::{EnrichedItem, NewsItem, NewsSource, Sentiment};
pub use price::{PriceProvider, PriceQuote};
