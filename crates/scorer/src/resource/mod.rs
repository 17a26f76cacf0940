// ABOUTME: Page fetcher used by site analysis and the LLM path.
// ABOUTME: Handles HTTP fetching with SSRF protection, a request timeout, size limits, and charset decoding.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use ipnet::IpNet;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::AnalysisError;

/// Maximum allowed content length (10 MB).
pub const MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Default fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// RFC1918, loopback, link-local and IPv6 unique-local/link-local ranges.
static PRIVATE_NETS: Lazy<Vec<IpNet>> = Lazy::new(|| {
    [
        "10.0.0.0/8",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "127.0.0.0/8",
        "169.254.0.0/16",
        "fc00::/7",
        "fe80::/10",
    ]
    .iter()
    .filter_map(|net| net.parse().ok())
    .collect()
});

/// Options for fetching a page.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub headers: HashMap<String, String>,
    pub allow_private_networks: bool,
    pub timeout: Duration,
    pub max_content_length: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            allow_private_networks: false,
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_content_length: MAX_CONTENT_LENGTH,
        }
    }
}

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResult {
    /// Decode the body as text, using charset hints from the content-type header.
    pub fn text(&self) -> String {
        decode_body(&self.body, self.content_type.as_deref())
    }
}

/// Check if an IP address is in a private/reserved range.
pub(crate) fn is_private_ip(addr: &IpAddr) -> bool {
    if addr.is_loopback() {
        return true;
    }
    PRIVATE_NETS.iter().any(|net| net.contains(addr))
}

/// Decode body bytes to a String using the content-type charset or detection.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    if let Some(ct) = content_type {
        if let Some(charset) = extract_charset(ct) {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(body);
                return decoded.into_owned();
            }
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(body, true);
    let encoding = detector.guess(None, true);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

/// Extract the charset value from a Content-Type header.
fn extract_charset(content_type: &str) -> Option<String> {
    let lower = content_type.to_lowercase();
    for part in lower.split(';') {
        let trimmed = part.trim();
        if let Some(charset) = trimmed.strip_prefix("charset=") {
            let charset = charset.trim_matches('"').trim_matches('\'');
            return Some(charset.to_string());
        }
    }
    None
}

/// Resolve `url`'s host and fail with an SSRF error if any address is private.
async fn ensure_public_host(
    url: &str,
    target: &url::Url,
    what: &str,
) -> Result<(), AnalysisError> {
    let Some(host) = target.host_str() else {
        return Ok(());
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(AnalysisError::ssrf(
                url,
                "Fetch",
                Some(anyhow::anyhow!("{} private IP address is not allowed", what)),
            ));
        }
        return Ok(());
    }

    let port = target.port_or_known_default().unwrap_or(80);
    let addrs = tokio::net::lookup_host((host, port)).await.map_err(|e| {
        AnalysisError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("DNS lookup failed: {}", e)),
        )
    })?;
    for socket_addr in addrs {
        if is_private_ip(&socket_addr.ip()) {
            return Err(AnalysisError::ssrf(
                url,
                "Fetch",
                Some(anyhow::anyhow!("{} private IP address is not allowed", what)),
            ));
        }
    }
    Ok(())
}

fn too_large(url: &str) -> AnalysisError {
    AnalysisError::fetch(url, "Fetch", Some(anyhow::anyhow!("content too large")))
}

fn request_error(url: &str, what: &str, e: reqwest::Error) -> AnalysisError {
    if e.is_timeout() {
        AnalysisError::timeout(url, "Fetch", Some(anyhow::anyhow!("{}: {}", what, e)))
    } else {
        AnalysisError::fetch(url, "Fetch", Some(anyhow::anyhow!("{}: {}", what, e)))
    }
}

/// Fetch a page from the given URL.
///
/// A single attempt: any network error, timeout, oversized body or non-2xx
/// status is returned as an error.
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    opts: &FetchOptions,
) -> Result<FetchResult, AnalysisError> {
    if url.is_empty() {
        return Err(AnalysisError::invalid_url(url, "Fetch", None));
    }

    let parsed_url = url::Url::parse(url).map_err(|e| {
        AnalysisError::invalid_url(url, "Fetch", Some(anyhow::anyhow!("invalid URL: {}", e)))
    })?;

    let scheme = parsed_url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(AnalysisError::invalid_url(
            url,
            "Fetch",
            Some(anyhow::anyhow!("scheme must be http or https")),
        ));
    }

    if !opts.allow_private_networks {
        ensure_public_host(url, &parsed_url, "target").await?;
    }

    let mut request = client.get(url).timeout(opts.timeout);
    for (key, value) in &opts.headers {
        request = request.header(key, value);
    }

    debug!(url, timeout_ms = opts.timeout.as_millis() as u64, "fetching page");
    let mut response = request
        .send()
        .await
        .map_err(|e| request_error(url, "request failed", e))?;

    // Redirects may have landed somewhere private.
    if !opts.allow_private_networks {
        let final_url = response.url().clone();
        ensure_public_host(url, &final_url, "redirect to").await?;
    }

    let content_length = response.content_length().or_else(|| {
        response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
    });
    if let Some(len) = content_length {
        if len > opts.max_content_length as u64 {
            return Err(too_large(url));
        }
    }

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());

    // Content-Length may be absent or wrong, so the limit is enforced while reading.
    let mut buf = BytesMut::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| request_error(url, "failed to read body", e))?
    {
        if buf.len() + chunk.len() > opts.max_content_length {
            return Err(too_large(url));
        }
        buf.extend_from_slice(&chunk);
    }
    let body = buf.freeze();

    if !(200..300).contains(&status) {
        return Err(AnalysisError::fetch(
            url,
            "Fetch",
            Some(anyhow::anyhow!("HTTP status {}", status)),
        ));
    }

    debug!(url, final_url = %final_url, status, bytes = body.len(), "page fetched");
    Ok(FetchResult {
        status,
        content_type,
        body,
    })
}
