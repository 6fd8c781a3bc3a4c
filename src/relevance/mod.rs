//! Topic relevance scoring
//!
//! The seed page defines the topic: its keywords (body, title, headings, meta
//! tags), its path segments, and its domain. Candidate links are scored
//! against that baseline and only links at or above the configured minimum
//! are followed in a relevance-guided crawl.

mod analyzer;
mod keywords;
mod report;
mod text;

pub use analyzer::{is_navigation_text, is_unrelated_url, RelevanceAnalyzer, RelevanceBaseline};
pub use keywords::{extract_keywords, jaccard};
pub use report::{RelevanceReport, ScoredUrl};
pub use text::{
    content_text, extract_headings, extract_meta, extract_title, visible_text, PageMeta, PageText,
};
