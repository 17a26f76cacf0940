// ABOUTME: The read-only document contract the analyzers score against, plus its scraper-backed implementation.
// ABOUTME: Exposes only full text, find-all-by-tag-names, and attribute lookup.

//! Parsed page documents.
//!
//! The analyzers never touch a parser directly. They see a [`PageDocument`],
//! which offers the flattened plain text of the page and a tag query, and the
//! [`PageNode`]s that query returns, which offer attribute lookup.

use scraper::{ElementRef, Html, Node};

/// Elements whose text content is never part of the plain-text view.
const NON_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// An element returned by [`PageDocument::find_all`].
pub trait PageNode {
    /// Value of the named attribute, if present.
    fn attr(&self, name: &str) -> Option<&str>;
}

/// Immutable view of a parsed page.
pub trait PageDocument {
    type Node<'a>: PageNode
    where
        Self: 'a;

    /// Whitespace-normalized plain text with case preserved.
    fn full_text(&self) -> &str;

    /// All elements whose tag name matches one of `tags` (ASCII case-insensitive),
    /// in document order.
    fn find_all<'a>(&'a self, tags: &[&str]) -> Vec<Self::Node<'a>>;
}

/// A [`PageDocument`] backed by an html5ever tree.
///
/// Parsing never fails: malformed markup is repaired by the HTML5 tree
/// builder, so broken pages simply expose fewer elements.
pub struct HtmlDocument {
    html: Html,
    text: String,
}

impl HtmlDocument {
    /// Parse a full HTML document.
    pub fn parse(raw_html: &str) -> Self {
        let html = Html::parse_document(raw_html);
        let text = collect_text(&html);
        Self { html, text }
    }
}

impl std::fmt::Debug for HtmlDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HtmlDocument")
            .field("text_len", &self.text.len())
            .finish()
    }
}

impl PageNode for ElementRef<'_> {
    fn attr(&self, name: &str) -> Option<&str> {
        self.value().attr(name)
    }
}

impl PageDocument for HtmlDocument {
    type Node<'a> = ElementRef<'a>;

    fn full_text(&self) -> &str {
        &self.text
    }

    fn find_all<'a>(&'a self, tags: &[&str]) -> Vec<ElementRef<'a>> {
        self.html
            .tree
            .nodes()
            .filter_map(ElementRef::wrap)
            .filter(|el| {
                let name = el.value().name();
                tags.iter().any(|t| t.eq_ignore_ascii_case(name))
            })
            .collect()
    }
}

/// Join every visible text node, trimmed and whitespace-collapsed, with single spaces.
fn collect_text(html: &Html) -> String {
    let mut parts: Vec<String> = Vec::new();
    for node in html.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| match a.value() {
            Node::Element(el) => NON_TEXT_TAGS
                .iter()
                .any(|t| t.eq_ignore_ascii_case(el.name())),
            _ => false,
        });
        if hidden {
            continue;
        }
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            parts.push(collapsed);
        }
    }
    parts.join(" ")
}
