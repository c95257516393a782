use thiserror::Error;

/// Failure taxonomy for the scrape path.
///
/// `InvalidUrl` is a security rejection: the fetch must not proceed.
/// `HostNotFound` is a data problem (dead or fictional host), not an attack.
/// `Fetch` covers transient network and HTTP failures; callers recover by
/// keeping the search snippet for that one URL.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("host not found: {0}")]
    HostNotFound(String),

    #[error("fetch failed: {0}")]
    Fetch(String),
}
