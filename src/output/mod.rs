//! Output module for presenting crawl reports
//!
//! This module handles:
//! - Rendering a finished crawl as human-readable text
//! - Emitting results as JSON lines for other tools
//! - Summarizing crawl, executor, cache, and relevance statistics

mod json;
pub mod stats;
mod text;

pub use json::write_json_lines;
pub use stats::{format_cache_stats, format_relevance_report, format_statistics};
pub use text::{format_result, format_text_report};

use crate::cache::CacheStats;
use crate::crawler::CrawlReport;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown output format: {0}")]
    UnknownFormat(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// How a report is written to the terminal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    /// One JSON object per result, then a summary object
    Json,
}

impl FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            other => Err(OutputError::UnknownFormat(other.to_string())),
        }
    }
}

/// Writes `report` in the requested format
pub fn write_report<W: Write>(
    out: &mut W,
    report: &CrawlReport,
    cache: Option<&CacheStats>,
    format: OutputFormat,
) -> OutputResult<()> {
    match format {
        OutputFormat::Text => {
            out.write_all(format_text_report(report, cache).as_bytes())?;
        }
        OutputFormat::Json => write_json_lines(out, report, cache)?,
    }
    out.flush()?;
    Ok(())
}
