// ABOUTME: The Client that runs site analysis: fetch a page, parse it, run the three analyzers.
// ABOUTME: Also runs the heuristic and LLM paths side by side for a combined SiteReport.

use std::net::ToSocketAddrs;

use tracing::{debug, info, warn};

use crate::analyzers::{cite_sources_breakdown, quotation_breakdown, statistics_breakdown};
use crate::analyzers::citation::origin_of;
use crate::document::{HtmlDocument, PageDocument};
use crate::error::AnalysisError;
use crate::llm::FeatureExtractor;
use crate::options::{ClientBuilder, Options};
use crate::resource::{fetch, is_private_ip, FetchOptions};
use crate::result::{AnalysisResult, ScoreBreakdown, SiteReport};

/// Run all three analyzers over one document.
///
/// `origin` is the authority of the document's own URL and decides which
/// links count as external.
pub fn score_document<D: PageDocument>(doc: &D, origin: &str) -> ScoreBreakdown {
    let breakdown = ScoreBreakdown {
        statistics: statistics_breakdown(doc),
        quotation: quotation_breakdown(doc),
        citation: cite_sources_breakdown(doc, origin),
    };
    debug!(origin, ?breakdown, "document scored");
    breakdown
}

/// Build the reqwest client used for page fetches.
///
/// Redirects into private networks are refused unless explicitly allowed.
pub(crate) fn build_http_client(opts: &Options) -> reqwest::Client {
    if let Some(client) = opts.http_client.clone() {
        return client;
    }

    let allow_private = opts.allow_private_networks;
    let redirect_policy = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= 8 {
            return attempt.error("too many redirects");
        }
        if allow_private {
            return attempt.follow();
        }
        let next = attempt.url().clone();
        let Some(host) = next.host_str() else {
            return attempt.follow();
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            if is_private_ip(&ip) {
                return attempt.error("redirect to private IP blocked");
            }
            return attempt.follow();
        }
        // synchronous DNS resolution to avoid async in redirect policy
        let port = next.port_or_known_default().unwrap_or(80);
        match (host, port).to_socket_addrs() {
            Ok(addrs) => {
                for sa in addrs {
                    if is_private_ip(&sa.ip()) {
                        return attempt.error("redirect to private IP blocked");
                    }
                }
                attempt.follow()
            }
            Err(_) => attempt.error("DNS lookup failed during redirect"),
        }
    });

    reqwest::Client::builder()
        .redirect(redirect_policy)
        .user_agent(&opts.user_agent)
        .timeout(opts.timeout)
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "falling back to a default HTTP client");
            reqwest::Client::new()
        })
}

pub(crate) fn fetch_options(opts: &Options) -> FetchOptions {
    FetchOptions {
        headers: opts.headers.clone(),
        allow_private_networks: opts.allow_private_networks,
        timeout: opts.timeout,
        ..FetchOptions::default()
    }
}

/// The analysis client: fetches pages and scores them.
///
/// Holds no per-page state; one client can analyze any number of pages,
/// concurrently if the caller wishes.
pub struct Client {
    opts: Options,
    http_client: reqwest::Client,
}

impl Client {
    /// Create a new ClientBuilder for configuring the client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a new Client with the given options.
    pub fn new(opts: Options) -> Self {
        let http_client = build_http_client(&opts);
        Self { opts, http_client }
    }

    /// Fetch a page and return its three scores.
    ///
    /// One fetch attempt; a failed fetch is the whole result.
    pub async fn analyze(&self, url: &str) -> Result<AnalysisResult, AnalysisError> {
        Ok(self.analyze_report(url).await?.scores)
    }

    /// Fetch a page and return its scores together with the signal breakdown.
    pub async fn analyze_report(&self, url: &str) -> Result<SiteReport, AnalysisError> {
        let origin = validate_url(url, "Analyze")?;
        let fetched = fetch(&self.http_client, url, &fetch_options(&self.opts)).await?;
        let raw_html = fetched.text();
        Ok(build_report(url, origin, &raw_html))
    }

    /// Score markup that was fetched elsewhere; `url` is where it came from.
    pub fn analyze_html(&self, html: &str, url: &str) -> Result<SiteReport, AnalysisError> {
        let origin = validate_url(url, "AnalyzeHtml")?;
        Ok(build_report(url, origin, html))
    }

    /// Run the heuristic path and the LLM path concurrently.
    ///
    /// The heuristic fetch failing fails the call at once, dropping the LLM
    /// work still in flight. The LLM path failing is recorded in `llm_error`
    /// and leaves the scores untouched.
    pub async fn analyze_with_features<E: FeatureExtractor>(
        &self,
        url: &str,
        extractor: &E,
    ) -> Result<SiteReport, AnalysisError> {
        let (mut report, features) = tokio::try_join!(self.analyze_report(url), async {
            Ok::<_, AnalysisError>(extractor.extract(url).await)
        })?;
        match features {
            Ok(record) => report.llm_features = Some(record),
            Err(e) => {
                warn!(url, error = %e, "LLM feature extraction failed");
                report.llm_error = Some(e.to_string());
            }
        }
        Ok(report)
    }
}

fn validate_url(url: &str, op: &str) -> Result<String, AnalysisError> {
    if url.is_empty() {
        return Err(AnalysisError::invalid_url(url, op, None));
    }
    if url::Url::parse(url).is_err() {
        return Err(AnalysisError::invalid_url(
            url,
            op,
            Some(anyhow::anyhow!("malformed URL")),
        ));
    }
    Ok(origin_of(url))
}

fn build_report(url: &str, origin: String, raw_html: &str) -> SiteReport {
    let doc = HtmlDocument::parse(raw_html);
    let breakdown = score_document(&doc, &origin);
    let scores = breakdown.result();
    info!(
        url,
        statistics = scores.statistics_score,
        quotation = scores.quotation_score,
        cite_sources = scores.cite_sources_score,
        "site analyzed"
    );
    SiteReport {
        url: url.to_string(),
        origin,
        scores,
        breakdown: Some(breakdown),
        llm_features: None,
        llm_error: None,
    }
}
