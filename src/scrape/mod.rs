//! Page fetching with scrape-time SSRF protection.

pub mod guard;
pub mod sanitize;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};

use crate::config::ScrapeConfig;
use crate::error::ScrapeError;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Capability interface for fetching a page's visible text.
#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Fetches pages over HTTP with the safety guard applied before every request.
///
/// Redirects are disabled: following one could route a guard-approved URL to
/// a private target. A redirect response therefore surfaces as a non-2xx
/// fetch failure.
pub struct HttpScraper {
    client: reqwest::Client,
}

impl HttpScraper {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Scraper for HttpScraper {
    #[instrument(skip(self))]
    async fn scrape(&self, url: &str) -> Result<String, ScrapeError> {
        let url = guard::validate(url).await?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ScrapeError::Fetch(format!("failed to retrieve content: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Fetch(format!("HTTP {status} for {url}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !is_textual(&content_type) {
            // Nothing to extract from binary responses; not an error.
            debug!(%url, content_type, "skipping non-text response");
            return Ok(String::new());
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::Fetch(format!("failed to read body: {e}")))?;

        Ok(sanitize::extract_text(&body))
    }
}

fn is_textual(content_type: &str) -> bool {
    content_type.contains("html") || content_type.starts_with("text/")
}
