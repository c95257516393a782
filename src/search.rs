//! Fault-tolerant search-and-scrape pipeline. A search-provider outage must
//! never abort the research session, so failures degrade through three tiers:
//! retry with a reformulated query, then a deterministic offline result,
//! always leaving at least one source for the summarizer.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::clients::SearchBackend;
use crate::models::SearchResult;
use crate::scrape::Scraper;
use crate::text;

const MAX_RESULTS: usize = 3;

/// Output of one research step: formatted source text, citation lines, and
/// the non-fatal diagnostics collected along the way.
#[derive(Debug, Clone)]
pub struct ResearchStep {
    pub formatted: String,
    pub citations: String,
    pub diagnostics: Vec<String>,
}

pub struct ResearchPipeline {
    search: Arc<dyn SearchBackend>,
    scraper: Arc<dyn Scraper>,
    max_tokens_per_source: usize,
}

impl ResearchPipeline {
    pub fn new(
        search: Arc<dyn SearchBackend>,
        scraper: Arc<dyn Scraper>,
        max_tokens_per_source: usize,
    ) -> Self {
        Self {
            search,
            scraper,
            max_tokens_per_source,
        }
    }

    /// Search, scrape each result, and format sources. Never errors: every
    /// failure is degraded into diagnostics plus best-effort output.
    #[instrument(skip(self))]
    pub async fn search_and_scrape(&self, query: &str, loop_count: u32) -> ResearchStep {
        let mut diagnostics: Vec<String> = Vec::new();

        let mut results = match self.search.search(query, MAX_RESULTS).await {
            Ok(results) => results,
            Err(e) => {
                let message = format!("Primary search failed for '{query}': {e}");
                warn!("{message}");
                diagnostics.push(message);
                Vec::new()
            }
        };

        if results.is_empty() {
            let fallback_query = build_fallback_query(query);
            let message =
                format!("No results returned for '{query}'. Retrying with '{fallback_query}'.");
            warn!("{message}");
            diagnostics.push(message);

            results = match self.search.search(&fallback_query, MAX_RESULTS).await {
                Ok(results) => results,
                Err(e) => {
                    let message = format!("Fallback search failed for '{fallback_query}': {e}");
                    warn!("{message}");
                    diagnostics.push(message);
                    Vec::new()
                }
            };
        }

        let mut offline_fallback = false;
        if results.is_empty() {
            let message =
                "Search results were empty after fallback. Using offline fallback data.".to_string();
            warn!("{message}");
            diagnostics.push(message);
            results = vec![build_offline_result(query)];
            offline_fallback = true;
        }

        // Offline content needs no fetching. Otherwise scrape result URLs
        // concurrently; an individual failure is expected (403s, timeouts)
        // and only downgrades that source to its snippet.
        if !offline_fallback {
            let fetches = results
                .iter()
                .map(|result| {
                    let url = result.url.clone();
                    let scraper = Arc::clone(&self.scraper);
                    async move {
                        if url.is_empty() {
                            return None;
                        }
                        match scraper.scrape(&url).await {
                            Ok(content) if !content.is_empty() => Some(content),
                            Ok(_) => None,
                            Err(e) => {
                                debug!(%url, error = %e, "scraping failed, using snippet");
                                None
                            }
                        }
                    }
                })
                .collect::<Vec<_>>();

            for (result, scraped) in results.iter_mut().zip(join_all(fetches).await) {
                if let Some(content) = scraped {
                    result.content = content;
                }
            }
        }

        ResearchStep {
            formatted: text::deduplicate_and_format(&results, self.max_tokens_per_source),
            citations: text::format_citations(&results),
            diagnostics,
        }
    }
}

/// Deterministic reformulation used when the primary query returns nothing.
fn build_fallback_query(query: &str) -> String {
    let base = query.trim();
    let base = if base.is_empty() { "technology trends" } else { base };
    format!("{base} latest developments")
}

/// Synthetic result used when the search backend is unusable, trading
/// accuracy for liveness so downstream steps always have a source.
fn build_offline_result(query: &str) -> SearchResult {
    let slug = query
        .split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "research-overview".to_string() } else { slug };
    let topic = if query.trim().is_empty() { "research" } else { query };
    let summary = format!(
        "This is an offline fallback summary for '{query}'. It indicates that live \
         search results were unavailable at runtime. Review system connectivity or \
         search engine configuration to restore live data."
    );
    SearchResult::new(
        format!("Fallback insights for {topic}"),
        format!("https://example.com/{slug}"),
        summary,
    )
}
