//! Plain-text rendering of a crawl report

use crate::cache::CacheStats;
use crate::crawler::{CrawlReport, CrawlResult};
use crate::output::stats::{format_cache_stats, format_relevance_report, format_statistics};

/// Characters of page text shown under each result
const PREVIEW_CHARS: usize = 160;

/// Formats the whole report: one block per page, then the summaries
pub fn format_text_report(report: &CrawlReport, cache: Option<&CacheStats>) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Crawl of {} ({}) ===\n\n", report.seed, report.state));

    let mut results: Vec<&CrawlResult> = report.results.iter().collect();
    results.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.url.cmp(&b.url)));
    for result in results {
        out.push_str(&format_result(result));
        out.push('\n');
    }

    out.push_str(&format_statistics(&report.stats, &report.executor));
    if let Some(cache) = cache {
        out.push('\n');
        out.push_str(&format_cache_stats(cache));
    }
    if let Some(relevance) = &report.relevance {
        out.push('\n');
        out.push_str(&format_relevance_report(relevance));
    }

    out
}

/// Formats one page result
pub fn format_result(result: &CrawlResult) -> String {
    let mut out = String::new();
    let indent = "  ".repeat(result.depth as usize);

    match &result.error {
        Some(error) => {
            out.push_str(&format!("{}✗ {} [{}]\n", indent, result.url, error.kind));
            out.push_str(&format!("{}  {}\n", indent, error.message));
        }
        None => {
            let cached = if result.from_cache { " (cached)" } else { "" };
            out.push_str(&format!("{}✓ {}{}\n", indent, result.url, cached));
            if let Some(title) = &result.title {
                out.push_str(&format!("{}  Title: {}\n", indent, title));
            }
            out.push_str(&format!(
                "{}  Links: {}  Score: {:.2}\n",
                indent,
                result.outgoing_links.len(),
                result.relevance_score
            ));
            if !result.matched_keywords.is_empty() {
                out.push_str(&format!(
                    "{}  Keywords: {}\n",
                    indent,
                    result.matched_keywords.join(", ")
                ));
            }
            if let Some(text) = result.text_content.as_deref().filter(|t| !t.is_empty()) {
                let preview: String = text.chars().take(PREVIEW_CHARS).collect();
                let ellipsis = if text.chars().count() > PREVIEW_CHARS { "…" } else { "" };
                out.push_str(&format!("{}  {}{}\n", indent, preview, ellipsis));
            }
        }
    }

    out
}
