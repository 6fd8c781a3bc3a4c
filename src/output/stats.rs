//! Statistics summaries
//!
//! Formats the counters a crawl produces: page totals and throughput, the
//! executor's request counters, cache occupancy, and the relevance report.

use crate::cache::CacheStats;
use crate::crawler::{CrawlStats, ExecutorStats};
use crate::relevance::{RelevanceReport, ScoredUrl};

/// Formats page totals and executor counters
pub fn format_statistics(stats: &CrawlStats, executor: &ExecutorStats) -> String {
    let mut out = String::new();

    out.push_str("=== Crawl Statistics ===\n\n");

    out.push_str("Pages:\n");
    out.push_str(&format!("  Total: {}\n", stats.total));
    out.push_str(&format!("  Successful: {}\n", stats.successful));
    out.push_str(&format!("  Failed: {}\n", stats.failed));
    out.push_str(&format!("  Matching keywords: {}\n", stats.matched));
    out.push_str(&format!("  Links found: {}\n", stats.links_found));
    out.push_str(&format!(
        "  Success rate: {:.1}%\n",
        stats.success_rate() * 100.0
    ));
    out.push_str(&format!(
        "  Duration: {:.1}s ({:.2} pages/s)\n",
        stats.duration().as_secs_f64(),
        stats.pages_per_second()
    ));
    out.push('\n');

    out.push_str("Requests:\n");
    out.push_str(&format!("  Sent: {}\n", executor.requests));
    out.push_str(&format!("  Cache hits: {}\n", executor.cache_hits));
    out.push_str(&format!("  Retries: {}\n", executor.retries));
    out.push_str(&format!("  Errors: {}\n", executor.errors));
    out.push_str(&format!("  Rate limited (429): {}\n", executor.rate_limited));

    out
}

pub fn format_cache_stats(cache: &CacheStats) -> String {
    let mut out = String::new();

    out.push_str("Cache:\n");
    out.push_str(&format!(
        "  Entries: {} ({} valid, {} expired)\n",
        cache.total_entries, cache.valid_entries, cache.expired_entries
    ));
    out.push_str(&format!(
        "  Size: {:.1} KiB of {:.1} KiB ({:.1}%)\n",
        cache.total_bytes as f64 / 1024.0,
        cache.max_bytes as f64 / 1024.0,
        cache.usage_percent
    ));
    out.push_str(&format!(
        "  Hits: {} memory, {} durable; misses: {}\n",
        cache.memory_hits, cache.durable_hits, cache.misses
    ));

    out
}

/// Formats the score distribution of a relevance-guided crawl
pub fn format_relevance_report(report: &RelevanceReport) -> String {
    let mut out = String::new();

    out.push_str("=== Relevance Report ===\n\n");
    if report.is_empty() {
        out.push_str("No links were scored.\n");
        return out;
    }

    out.push_str(&format!("  Links analyzed: {}\n", report.total_analyzed));
    out.push_str(&format!("  Average score: {:.3}\n", report.average_score));
    out.push_str(&format!(
        "  Score range: {:.3} - {:.3}\n",
        report.min_score, report.max_score
    ));
    out.push_str(&format!(
        "  At or above {:.2}: {} ({:.1}%)\n",
        report.threshold,
        report.above_threshold,
        report.above_threshold as f64 / report.total_analyzed as f64 * 100.0
    ));

    push_scored(&mut out, "Most relevant", &report.top);
    push_scored(&mut out, "Least relevant", &report.bottom);

    out
}

fn push_scored(out: &mut String, heading: &str, urls: &[ScoredUrl]) {
    out.push_str(&format!("\n{}:\n", heading));
    for scored in urls {
        out.push_str(&format!("  {:.3}  {}\n", scored.score, scored.url));
    }
}
