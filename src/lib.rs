//! Iterative web research as a library: generate a search query, search and
//! scrape the web with layered fallbacks, progressively summarize findings,
//! reflect on knowledge gaps, and loop until the configured depth is reached,
//! emitting a cited article plus a structured verdict.
//!
//! The caller supplies the topic, a [`config::WorkflowConfig`], and concrete
//! [`clients::LlmClient`] / [`clients::SearchBackend`] / [`scrape::Scraper`]
//! implementations, then drives [`workflow::ResearchWorkflow::run`].

pub mod clients;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod prompts;
pub mod scrape;
pub mod search;
pub mod text;
pub mod workflow;

pub use config::{ScrapeConfig, StructuredOutputMode, WorkflowConfig};
pub use error::ScrapeError;
pub use models::{FinalVerdict, ResearchState, SearchResult};
pub use workflow::ResearchWorkflow;
