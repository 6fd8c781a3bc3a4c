use crate::cache::CacheStats;
use crate::crawler::{CrawlReport, CrawlStats, ExecutorStats, Sitemap};
use crate::output::OutputResult;
use crate::relevance::RelevanceReport;
use crate::state::EngineState;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct Summary<'a> {
    state: EngineState,
    stats: &'a CrawlStats,
    executor: &'a ExecutorStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache: Option<&'a CacheStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relevance: Option<&'a RelevanceReport>,
    sitemap: Sitemap,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: Summary<'a>,
}

/// Writes one line per page result followed by a `{"summary": ...}` line
pub fn write_json_lines<W: Write>(
    out: &mut W,
    report: &CrawlReport,
    cache: Option<&CacheStats>,
) -> OutputResult<()> {
    for result in &report.results {
        serde_json::to_writer(&mut *out, result)?;
        out.write_all(b"\n")?;
    }

    let summary = Summary {
        state: report.state,
        stats: &report.stats,
        executor: &report.executor,
        cache,
        relevance: report.relevance.as_ref(),
        sitemap: report.sitemap(),
    };
    serde_json::to_writer(&mut *out, &SummaryLine { summary })?;
    out.write_all(b"\n")?;
    Ok(())
}
