//! Page extraction
//!
//! Each `ExtractionKind` pulls one facet out of a parsed document. A page is
//! parsed once and every kind runs against the same tree.

use crate::relevance::{
    extract_headings, extract_meta, extract_title, visible_text, PageMeta, PageText,
};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Characters of surrounding text kept on each side of a link
const CONTEXT_RADIUS: usize = 50;

static ANCHORS: Lazy<Result<Selector, String>> =
    Lazy::new(|| Selector::parse("a[href]").map_err(|e| e.to_string()));
static CANONICAL: Lazy<Result<Selector, String>> =
    Lazy::new(|| Selector::parse("link[rel='canonical'][href]").map_err(|e| e.to_string()));

#[derive(Debug, Clone, Error)]
#[error("{kind:?} extraction failed: {message}")]
pub struct ExtractError {
    pub kind: ExtractionKind,
    pub message: String,
}

/// A hyperlink found on a page
#[derive(Debug, Clone, PartialEq)]
pub struct PageLink {
    /// Absolute http(s) URL, not yet normalized
    pub url: Url,
    /// Anchor text, whitespace-collapsed
    pub text: String,
    /// Text around the anchor within its parent element
    pub context: String,
}

/// Facets a page can be mined for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionKind {
    Title,
    Text,
    Headings,
    Meta,
    Links,
}

/// Output of one `ExtractionKind`
#[derive(Debug, Clone)]
pub enum Extracted {
    Title(Option<String>),
    Text(String),
    Headings(Vec<String>),
    Meta(PageMeta),
    Links(Vec<PageLink>),
}

impl ExtractionKind {
    pub const ALL: [ExtractionKind; 5] = [
        ExtractionKind::Title,
        ExtractionKind::Text,
        ExtractionKind::Headings,
        ExtractionKind::Meta,
        ExtractionKind::Links,
    ];

    pub fn extract(&self, document: &Html, base_url: &Url) -> Result<Extracted, ExtractError> {
        Ok(match self {
            ExtractionKind::Title => Extracted::Title(extract_title(document)),
            ExtractionKind::Text => Extracted::Text(visible_text(document)),
            ExtractionKind::Headings => Extracted::Headings(extract_headings(document)),
            ExtractionKind::Meta => Extracted::Meta(extract_meta(document)),
            ExtractionKind::Links => Extracted::Links(self.links(document, base_url)?),
        })
    }

    fn links(&self, document: &Html, base_url: &Url) -> Result<Vec<PageLink>, ExtractError> {
        let selector_error = |message: &String| ExtractError {
            kind: *self,
            message: message.clone(),
        };
        let anchors = ANCHORS.as_ref().map_err(selector_error)?;
        let canonical = CANONICAL.as_ref().map_err(selector_error)?;

        let mut links = Vec::new();
        for element in document.select(anchors) {
            if element.value().attr("download").is_some() {
                continue;
            }
            let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            else {
                continue;
            };

            let text = collapse_whitespace(&element.text().collect::<String>());
            let context = link_context(element, &text);
            links.push(PageLink { url, text, context });
        }

        for element in document.select(canonical) {
            if let Some(url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(PageLink {
                    url,
                    text: String::new(),
                    context: String::new(),
                });
            }
        }

        Ok(links)
    }
}

/// Everything the crawl needs from one HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: Option<String>,
    /// Visible text, not yet truncated
    pub text: String,
    pub headings: Vec<String>,
    pub meta: PageMeta,
    pub links: Vec<PageLink>,
}

impl ParsedPage {
    /// The view of this page the relevance analyzer scores
    pub fn relevance_text(&self) -> PageText {
        PageText {
            title: self.title.clone(),
            headings: self.headings.clone(),
            body: self.text.clone(),
            meta_keywords: self.meta.keywords.clone(),
            meta_description: self.meta.description.clone(),
        }
    }

    /// Visible text cut to at most `limit` characters
    pub fn truncated_text(&self, limit: usize) -> String {
        truncate_chars(&self.text, limit)
    }
}

/// Parses `html` and runs every extraction against it
pub fn parse_page(html: &str, base_url: &Url) -> Result<ParsedPage, ExtractError> {
    let document = Html::parse_document(html);
    let mut page = ParsedPage::default();

    for kind in ExtractionKind::ALL {
        match kind.extract(&document, base_url)? {
            Extracted::Title(title) => page.title = title,
            Extracted::Text(text) => page.text = text,
            Extracted::Headings(headings) => page.headings = headings,
            Extracted::Meta(meta) => page.meta = meta,
            Extracted::Links(links) => page.links = links,
        }
    }

    Ok(page)
}

/// Resolves an href against the page URL
///
/// Returns None for non-navigational hrefs (`javascript:`, `mailto:`, `tel:`,
/// `data:`, fragment-only) and anything that is not http(s) after resolution.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let resolved = base_url.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Up to `CONTEXT_RADIUS` characters either side of the anchor in its parent
fn link_context(anchor: ElementRef<'_>, anchor_text: &str) -> String {
    let Some(parent) = anchor.parent().and_then(ElementRef::wrap) else {
        return String::new();
    };
    let parent_text = collapse_whitespace(&parent.text().collect::<String>());
    let chars: Vec<char> = parent_text.chars().collect();

    let Some(byte_pos) = (!anchor_text.is_empty())
        .then(|| parent_text.find(anchor_text))
        .flatten()
    else {
        return chars.iter().take(CONTEXT_RADIUS * 2).collect();
    };

    let start_char = parent_text[..byte_pos].chars().count();
    let end_char = start_char + anchor_text.chars().count();
    let from = start_char.saturating_sub(CONTEXT_RADIUS);
    let to = (end_char + CONTEXT_RADIUS).min(chars.len());
    chars[from..to].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/news/").unwrap()
    }

    #[test]
    fn test_parse_page_collects_every_facet() {
        let html = r#"<html><head>
            <title> Daily News </title>
            <meta name="description" content="Headlines">
            </head><body>
            <h1>Top story</h1>
            <p>Read <a href="a">the first story</a> today.</p>
            <script>ignored()</script>
        </body></html>"#;

        let page = parse_page(html, &base()).unwrap();
        assert_eq!(page.title.as_deref(), Some("Daily News"));
        assert_eq!(page.headings, vec!["Top story"]);
        assert_eq!(page.meta.description.as_deref(), Some("Headlines"));
        assert!(page.text.contains("Read the first story today."));
        assert!(!page.text.contains("ignored"));
        assert_eq!(page.links.len(), 1);
        assert_eq!(page.links[0].url.as_str(), "https://example.com/news/a");
        assert_eq!(page.links[0].text, "the first story");
        assert_eq!(page.links[0].context, "Read the first story today.");
    }

    #[test]
    fn test_skips_non_navigational_links() {
        let html = r##"<body>
            <a href="javascript:void(0)">js</a>
            <a href="mailto:a@example.com">mail</a>
            <a href="TEL:123">tel</a>
            <a href="#top">top</a>
            <a href="ftp://example.com/file">ftp</a>
            <a href="/report.pdf" download>pdf</a>
            <a href="https://other.org/x">ok</a>
        </body>"##;
        let page = parse_page(html, &base()).unwrap();
        let urls: Vec<&str> = page.links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://other.org/x"]);
    }

    #[test]
    fn test_canonical_link_included() {
        let html = r#"<head><link rel="canonical" href="https://example.com/news"></head>"#;
        let page = parse_page(html, &base()).unwrap();
        assert_eq!(page.links.len(), 1);
        assert!(page.links[0].text.is_empty());
    }

    #[test]
    fn test_link_context_is_bounded() {
        let filler = "word ".repeat(40);
        let html = format!(
            r#"<p>{} <a href="/x">target link</a> {}</p>"#,
            filler, filler
        );
        let page = parse_page(&html, &base()).unwrap();
        let context = &page.links[0].context;
        assert!(context.contains("target link"));
        assert!(context.chars().count() <= CONTEXT_RADIUS * 2 + "target link".len());
    }

    #[test]
    fn test_truncated_text_respects_char_boundaries() {
        let page = ParsedPage {
            text: "héllo wörld".to_string(),
            ..ParsedPage::default()
        };
        assert_eq!(page.truncated_text(4), "héll");
        assert_eq!(page.truncated_text(100), "héllo wörld");
    }

    #[test]
    fn test_relevance_text_mirrors_page() {
        let page = parse_page(
            r#"<title>T</title><meta name="keywords" content="a,b"><h2>H</h2><p>body</p>"#,
            &base(),
        )
        .unwrap();
        let text = page.relevance_text();
        assert_eq!(text.title.as_deref(), Some("T"));
        assert_eq!(text.meta_keywords, vec!["a", "b"]);
        assert_eq!(text.headings, vec!["H"]);
    }
}
