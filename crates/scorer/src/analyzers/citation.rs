// ABOUTME: Citation analyzer scoring source references and outbound links in a document.
// ABOUTME: Combines external anchors, citation keywords, and sup footnote markers.

use serde::Serialize;
use url::Url;

use super::{count_keywords, normalize, round3};
use crate::document::{PageDocument, PageNode};

pub const CITATION_KEYWORDS: &[&str] = &[
    "reference",
    "references",
    "source",
    "sources",
    "bibliography",
    "citation",
];

const LINK_WEIGHT: f64 = 0.2;
const KEYWORD_WEIGHT: f64 = 0.5;
const SUP_WEIGHT: f64 = 0.2;
const DIVISOR: f64 = 8.0;

/// Signal counts behind a citation score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationBreakdown {
    pub external_links: usize,
    pub citation_keywords: usize,
    pub sup_tags: usize,
    pub raw: f64,
    pub score: f64,
}

fn authority(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

/// Network authority (host, plus an explicit non-default port) of an absolute URL.
///
/// Returns an empty string when the URL cannot be parsed or has no host.
pub fn origin_of(url: &str) -> String {
    Url::parse(url.trim())
        .map(|u| authority(&u))
        .unwrap_or_default()
}

/// Authority an href points at, or an empty string for relative, fragment-only,
/// and host-less (`mailto:`, `javascript:`) references.
pub fn link_authority(href: &str) -> String {
    let href = href.trim();
    if href.starts_with("//") {
        return origin_of(&format!("http:{}", href));
    }
    origin_of(href)
}

/// Compute the citation score along with its signal counts.
///
/// `origin` is the authority of the page's own URL (see [`origin_of`]); links
/// to it are internal.
pub fn cite_sources_breakdown<D: PageDocument>(doc: &D, origin: &str) -> CitationBreakdown {
    let text = doc.full_text().to_lowercase();

    let external_links = doc
        .find_all(&["a"])
        .iter()
        .filter_map(|a| a.attr("href"))
        .filter(|href| !href.is_empty())
        .map(link_authority)
        .filter(|target| !target.is_empty() && target != origin)
        .count();

    let citation_keywords = count_keywords(&text, CITATION_KEYWORDS);
    let sup_tags = doc.find_all(&["sup"]).len();

    let raw = external_links as f64 * LINK_WEIGHT
        + citation_keywords as f64 * KEYWORD_WEIGHT
        + sup_tags as f64 * SUP_WEIGHT;

    CitationBreakdown {
        external_links,
        citation_keywords,
        sup_tags,
        raw,
        score: round3(normalize(raw, DIVISOR)),
    }
}

/// Score how well a document points at its sources, rounded to three decimals.
pub fn cite_sources_score<D: PageDocument>(doc: &D, origin: &str) -> f64 {
    cite_sources_breakdown(doc, origin).score
}
