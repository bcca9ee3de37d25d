//! Summaries, sentiment and the market overview produced by the completion
//! service, with caching in front of every call.

pub mod client;
pub mod overview;
pub mod pipeline;
pub mod prompts;

pub use client::EnrichmentClient;
pub use pipeline::{EnrichmentPipeline, PipelineOutcome};
