//! URL safety guard. Every fetch goes through [`ensure_url_allowed`] first so
//! a crafted search result cannot point the scraper at loopback, RFC 1918
//! space, or other non-public targets. Hostnames are resolved fresh on every
//! call; caching the verdict would reopen the DNS rebinding window.

use std::net::IpAddr;

use tokio::net::lookup_host;
use url::{Host, Url};

use crate::error::ScrapeError;

/// Parse and validate a raw URL string.
pub async fn validate(raw: &str) -> Result<Url, ScrapeError> {
    let url = Url::parse(raw).map_err(|e| ScrapeError::InvalidUrl(format!("{raw}: {e}")))?;
    ensure_url_allowed(&url).await?;
    Ok(url)
}

/// Check that a parsed URL uses http(s) and does not resolve to a blocked
/// address. A single disallowed address is enough to reject the whole
/// hostname, which defends against DNS answers mixing public and private
/// records.
pub async fn ensure_url_allowed(url: &Url) -> Result<(), ScrapeError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidUrl(format!(
            "scheme '{}' is not allowed",
            url.scheme()
        )));
    }

    let host = url
        .host()
        .ok_or_else(|| ScrapeError::InvalidUrl("url has no hostname".to_string()))?;

    match host {
        Host::Ipv4(ip) => {
            if ip_is_disallowed(IpAddr::V4(ip)) {
                return Err(blocked(&ip.to_string()));
            }
        }
        Host::Ipv6(ip) => {
            if ip_is_disallowed(IpAddr::V6(ip)) {
                return Err(blocked(&ip.to_string()));
            }
        }
        Host::Domain(domain) => {
            let domain = domain.to_ascii_lowercase();
            if domain == "localhost" || domain.ends_with(".localhost") {
                return Err(blocked(&domain));
            }
            let port = url.port_or_known_default().unwrap_or(80);
            let addrs: Vec<_> = lookup_host((domain.as_str(), port))
                .await
                .map_err(|e| ScrapeError::HostNotFound(format!("{domain}: {e}")))?
                .collect();
            if addrs.is_empty() {
                return Err(ScrapeError::HostNotFound(domain));
            }
            for addr in addrs {
                if ip_is_disallowed(addr.ip()) {
                    return Err(blocked(&domain));
                }
            }
        }
    }

    Ok(())
}

fn blocked(host: &str) -> ScrapeError {
    ScrapeError::InvalidUrl(format!("host '{host}' is not allowed"))
}

fn ip_is_disallowed(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_multicast()
                || v4.is_unspecified()
                // 240.0.0.0/4, reserved; Ipv4Addr::is_reserved is unstable.
                || (v4.octets()[0] & 0xf0) == 0xf0
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return ip_is_disallowed(IpAddr::V4(mapped));
            }
            v6.is_loopback()
                || v6.is_unique_local()
                || v6.is_unicast_link_local()
                || v6.is_multicast()
                || v6.is_unspecified()
        }
    }
}
