use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose text never counts as page content
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "nav", "footer", "header"];

static TITLE: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("title").ok());
static HEADINGS: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("h1, h2, h3").ok());
static META: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("meta[name]").ok());

/// Text of `element` and its descendants, skipping non-content subtrees
pub fn content_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) if NON_CONTENT_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, out);
                }
            }
            _ => {}
        }
    }
}

/// Visible text of a whole document
pub fn visible_text(document: &Html) -> String {
    content_text(document.root_element())
}

/// The parts of a page the relevance analyzer looks at
#[derive(Debug, Clone, Default)]
pub struct PageText {
    pub title: Option<String>,
    pub headings: Vec<String>,
    pub body: String,
    pub meta_keywords: Vec<String>,
    pub meta_description: Option<String>,
}

impl PageText {
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        Self::from_document(&document)
    }

    pub fn from_document(document: &Html) -> Self {
        let meta = extract_meta(document);
        Self {
            title: extract_title(document),
            headings: extract_headings(document),
            body: visible_text(document),
            meta_keywords: meta.keywords,
            meta_description: meta.description,
        }
    }
}

/// `keywords` and `description` meta tags
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMeta {
    pub keywords: Vec<String>,
    pub description: Option<String>,
}

pub fn extract_title(document: &Html) -> Option<String> {
    TITLE
        .as_ref()
        .and_then(|sel| document.select(sel).next())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Text of every h1-h3, in document order
pub fn extract_headings(document: &Html) -> Vec<String> {
    let Some(sel) = HEADINGS.as_ref() else {
        return Vec::new();
    };
    document
        .select(sel)
        .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn extract_meta(document: &Html) -> PageMeta {
    let mut meta = PageMeta::default();
    let Some(sel) = META.as_ref() else {
        return meta;
    };

    for element in document.select(sel) {
        let (Some(name), Some(content)) =
            (element.value().attr("name"), element.value().attr("content"))
        else {
            continue;
        };
        match name.to_ascii_lowercase().as_str() {
            "keywords" => meta.keywords.extend(
                content
                    .split(',')
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty()),
            ),
            "description" => meta.description = Some(content.trim().to_string()),
            _ => {}
        }
    }
    meta
}
