use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::SearchBackend;
use crate::models::SearchResult;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Search backend backed by a SearXNG instance's JSON API.
#[derive(Debug, Clone)]
pub struct SearxngClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SearxngClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint_search(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SearchBackend for SearxngClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let resp = self
            .client
            .get(self.endpoint_search())
            .query(&[("q", query), ("format", "json")])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| anyhow!("searxng request failed: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("searxng HTTP {status}"));
        }

        let parsed: SearxngResponse = resp
            .json()
            .await
            .map_err(|e| anyhow!("failed to parse searxng response: {e}"))?;

        let mut results = Vec::new();
        for r in parsed.results {
            if r.title.is_empty() || r.url.is_empty() || r.content.is_empty() {
                warn!(url = %r.url, "skipping incomplete searxng result");
                continue;
            }
            results.push(SearchResult::new(r.title, r.url, r.content));
            if results.len() >= max_results {
                break;
            }
        }
        Ok(results)
    }
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}
