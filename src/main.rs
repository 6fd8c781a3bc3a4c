//! Trawler main entry point
//!
//! This is the command-line interface for the Trawler crawler.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use trawler::config::{load_config_with_hash, validate, Config, ExecutionKind};
use trawler::crawler::{CrawlEngine, CrawlMode};
use trawler::output::{write_report, OutputFormat};
use tracing_subscriber::EnvFilter;

/// Trawler: a polite, topic-aware web crawler
///
/// Trawler walks links from a seed URL while respecting per-domain rate
/// limits and robots.txt, caching responses, and backing off when a site
/// throttles it.
#[derive(Parser, Debug)]
#[command(name = "trawler")]
#[command(version)]
#[command(about = "A polite, topic-aware web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl every accepted link from a seed, recording keyword matches
    Crawl {
        /// Seed URL
        url: String,

        /// Comma-separated keywords to look for on each page
        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        #[command(flatten)]
        limits: Limits,

        /// Keep fetches in flight on a single task instead of a worker pool
        #[arg(long = "async")]
        cooperative: bool,
    },

    /// Follow only links related to the seed page's topic
    SmartCrawl {
        /// Seed URL
        url: String,

        /// Extra topic keywords, comma-separated
        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Minimum score a link needs to be followed
        #[arg(long, value_name = "SCORE")]
        min_relevance: Option<f64>,

        /// Similarity threshold of the relevance analyzer
        #[arg(long, value_name = "SCORE")]
        similarity: Option<f64>,

        /// Relevant links followed per page
        #[arg(long, value_name = "N")]
        max_links: Option<usize>,

        #[command(flatten)]
        limits: Limits,
    },
}

#[derive(Args, Debug)]
struct Limits {
    /// Maximum link depth from the seed
    #[arg(short, long)]
    depth: Option<u32>,

    /// Maximum number of pages to visit
    #[arg(long)]
    max_pages: Option<usize>,

    /// Concurrent fetches
    #[arg(short, long)]
    workers: Option<usize>,

    /// Output format: text or json (JSON lines)
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

impl Limits {
    fn apply(&self, config: &mut Config) {
        if let Some(depth) = self.depth {
            config.crawler.max_depth = depth;
        }
        if let Some(max_pages) = self.max_pages {
            config.crawler.max_pages = max_pages;
        }
        if let Some(workers) = self.workers {
            config.crawler.max_workers = workers;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = load(cli.config.as_deref())?;

    let (seed, mode, format) = match cli.command {
        Command::Crawl {
            url,
            keywords,
            limits,
            cooperative,
        } => {
            limits.apply(&mut config);
            if cooperative {
                config.crawler.execution = ExecutionKind::Async;
            }
            (url, CrawlMode::Keyword { keywords }, limits.format)
        }
        Command::SmartCrawl {
            url,
            keywords,
            min_relevance,
            similarity,
            max_links,
            limits,
        } => {
            limits.apply(&mut config);
            if let Some(score) = min_relevance {
                config.relevance.min_relevance_score = score;
            }
            if let Some(threshold) = similarity {
                config.relevance.similarity_threshold = threshold;
            }
            if let Some(max_links) = max_links {
                config.relevance.max_links_per_page = max_links;
            }
            (url, CrawlMode::Relevance { keywords }, limits.format)
        }
    };

    validate(&config).context("invalid settings")?;
    run(config, &seed, mode, format).await
}

/// Loads the config file if one was given, defaults otherwise
fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);
    Ok(config)
}

async fn run(config: Config, seed: &str, mode: CrawlMode, format: OutputFormat) -> anyhow::Result<()> {
    let engine = CrawlEngine::from_config(&config)
        .context("failed to set up crawler")?
        .with_mode(mode)
        .with_progress(|done, target, message| {
            tracing::info!("[{}/{}] {}", done, target, message);
        });

    if let Some(cache) = engine.executor().cache() {
        match cache.purge_expired() {
            Ok(0) => {}
            Ok(purged) => tracing::info!("Purged {} expired cache entries", purged),
            Err(e) => tracing::warn!("Failed to purge expired cache entries: {}", e),
        }
    }

    let cancel = engine.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing pages in flight");
            cancel.cancel();
        }
    });

    let report = engine
        .run(seed)
        .await
        .with_context(|| format!("crawl of {} failed", seed))?;

    let cache_stats = match engine.executor().cache() {
        Some(cache) => Some(cache.stats().context("failed to read cache statistics")?),
        None => None,
    };

    let stdout = std::io::stdout();
    write_report(&mut stdout.lock(), &report, cache_stats.as_ref(), format)
        .context("failed to write report")?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("trawler=warn,warn")
    } else {
        match verbose {
            0 => EnvFilter::new("trawler=info,warn"),
            1 => EnvFilter::new("trawler=debug,info"),
            _ => EnvFilter::new("trawler=trace,debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}
