//! Crawl engine
//!
//! One traversal algorithm, two ways to run it:
//!
//! - `ExecutionMode::WorkerPool`: N spawned tasks pull from the shared frontier
//! - `ExecutionMode::Cooperative`: a single task keeps up to N fetches in
//!   flight, bounded by a semaphore
//!
//! In both, claiming a URL marks it visited under the run lock, and the
//! rate-limit wait and network I/O happen outside that lock.

use crate::cache::ResponseCache;
use crate::config::{BlocklistConfig, Config, CrawlerConfig, ExecutionKind, RelevanceConfig};
use crate::crawler::executor::FetchExecutor;
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::frontier::{Claim, CrawlTarget, Frontier, LinkOrigin};
use crate::crawler::parser::{parse_page, PageLink, ParsedPage};
use crate::crawler::response::FetchResponse;
use crate::crawler::result::{CrawlReport, CrawlResult, CrawlStats, PageError};
use crate::rate_limit::RateLimiter;
use crate::relevance::{RelevanceAnalyzer, RelevanceBaseline, RelevanceReport};
use crate::retry::RetryPolicy;
use crate::robots::RobotsGuard;
use crate::state::EngineState;
use crate::stealth::StealthProfile;
use crate::url::{extract_domain, normalize_url, LinkFilter, ShapeLimits};
use crate::{TrawlError, UrlError};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

/// `(pages_done, pages_target, status_message)`, called after every page
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Which links a crawl follows
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlMode {
    /// Follow every link the filter accepts; report keyword matches per page
    Keyword { keywords: Vec<String> },
    /// Follow only links related to the seed page's topic
    Relevance { keywords: Vec<String> },
}

impl Default for CrawlMode {
    fn default() -> Self {
        CrawlMode::Keyword {
            keywords: Vec::new(),
        }
    }
}

impl CrawlMode {
    pub fn keywords(&self) -> &[String] {
        match self {
            CrawlMode::Keyword { keywords } | CrawlMode::Relevance { keywords } => keywords,
        }
    }

    pub fn is_relevance(&self) -> bool {
        matches!(self, CrawlMode::Relevance { .. })
    }
}

/// How pages are fetched concurrently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    WorkerPool { workers: usize },
    Cooperative { max_in_flight: usize },
}

impl ExecutionMode {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        match config.execution {
            ExecutionKind::WorkerPool => ExecutionMode::WorkerPool {
                workers: config.max_workers,
            },
            ExecutionKind::Async => ExecutionMode::Cooperative {
                max_in_flight: config.max_workers,
            },
        }
    }

    pub fn concurrency(&self) -> usize {
        match *self {
            ExecutionMode::WorkerPool { workers } => workers.max(1),
            ExecutionMode::Cooperative { max_in_flight } => max_in_flight.max(1),
        }
    }
}

/// Stops a running crawl from outside
///
/// No new pages are claimed after `cancel`; pages already being fetched
/// finish or time out. Cancellation is sticky for the engine it came from.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Walks the link graph from a seed URL
pub struct CrawlEngine {
    executor: Arc<FetchExecutor>,
    crawler: CrawlerConfig,
    relevance: RelevanceConfig,
    blocklist: BlocklistConfig,
    mode: CrawlMode,
    execution: ExecutionMode,
    robots: Option<Arc<RobotsGuard>>,
    progress: Option<ProgressCallback>,
    cancel: CancelHandle,
}

impl CrawlEngine {
    /// Engine around an existing executor; robots.txt per `crawler.respect-robots`
    pub fn new(executor: Arc<FetchExecutor>, config: &Config) -> Self {
        let robots = config.crawler.respect_robots.then(|| {
            Arc::new(RobotsGuard::new(
                &config.crawler.user_agent,
                Duration::from_secs(config.crawler.request_timeout_secs),
            ))
        });

        Self {
            executor,
            crawler: config.crawler.clone(),
            relevance: config.relevance.clone(),
            blocklist: config.blocklist.clone(),
            mode: CrawlMode::default(),
            execution: ExecutionMode::from_config(&config.crawler),
            robots,
            progress: None,
            cancel: CancelHandle::default(),
        }
    }

    /// Engine with a reqwest fetcher and every collaborator built from `config`
    pub fn from_config(config: &Config) -> Result<Self, TrawlError> {
        let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
        let fetcher = HttpFetcher::new(timeout)
            .map_err(|e| TrawlError::Runtime(format!("failed to build HTTP client: {}", e)))?;

        let mut executor = FetchExecutor::new(
            Arc::new(fetcher),
            Arc::new(RateLimiter::from_config(&config.rate_limit)),
        )
        .with_retry_policy(RetryPolicy::from_config(&config.retry))
        .with_stealth(StealthProfile::from_config(
            &config.stealth,
            &config.crawler.user_agent,
        ))
        .with_timeout(timeout);

        if config.cache.enabled {
            executor = executor.with_cache(Arc::new(ResponseCache::from_config(&config.cache)?));
        }

        Ok(Self::new(Arc::new(executor), config))
    }

    pub fn with_mode(mut self, mode: CrawlMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn with_robots(mut self, robots: Option<RobotsGuard>) -> Self {
        self.robots = robots.map(Arc::new);
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn executor(&self) -> &FetchExecutor {
        &self.executor
    }

    pub fn mode(&self) -> &CrawlMode {
        &self.mode
    }

    /// Crawls from `seed` until the frontier drains, the page budget is
    /// spent, or the crawl is cancelled
    ///
    /// Only an invalid seed or a worker failure is an error; per-page
    /// failures are recorded on that page's result.
    pub async fn run(&self, seed: &str) -> Result<CrawlReport, TrawlError> {
        let seed_url = normalize_url(seed)?;
        extract_domain(&seed_url).ok_or(UrlError::MissingDomain)?;

        let mut filter = LinkFilter::new(&seed_url, &self.crawler, &self.blocklist)?;
        if self.mode.is_relevance() {
            filter = filter.with_shape_limits(ShapeLimits::from(&self.relevance));
        }

        let mut frontier = Frontier::new(self.crawler.max_pages, self.crawler.max_depth);
        frontier.push(CrawlTarget::seed(seed_url.clone()), false);

        let run = Arc::new(CrawlRun {
            executor: Arc::clone(&self.executor),
            robots: self.robots.clone(),
            filter,
            mode: self.mode.clone(),
            keywords: normalize_keywords(self.mode.keywords()),
            crawler: self.crawler.clone(),
            relevance: self.relevance.clone(),
            analyzer: OnceCell::new(),
            state: Mutex::new(RunState::new(frontier)),
            cancel: self.cancel.clone(),
            progress: self.progress.clone(),
        });

        let mut engine_state = EngineState::Idle;
        advance(&mut engine_state, EngineState::Running);
        info!(
            "Starting crawl of {} (max depth {}, max pages {}, {:?})",
            seed_url, self.crawler.max_depth, self.crawler.max_pages, self.execution
        );

        match self.execution {
            ExecutionMode::WorkerPool { .. } => {
                run_worker_pool(Arc::clone(&run), self.execution.concurrency()).await?
            }
            ExecutionMode::Cooperative { .. } => {
                run_cooperative(Arc::clone(&run), self.execution.concurrency()).await
            }
        }

        let (results, mut stats, link_scores, outcome) = {
            let mut state = run.lock();
            let outcome = state.frontier.outcome(run.cancel.is_cancelled());
            (
                std::mem::take(&mut state.results),
                state.stats.clone(),
                std::mem::take(&mut state.link_scores),
                outcome,
            )
        };
        advance(&mut engine_state, outcome);
        stats.finish(Utc::now());

        let relevance = self.mode.is_relevance().then(|| {
            RelevanceReport::from_scores(link_scores, self.relevance.min_relevance_score)
        });

        info!(
            "Crawl {}: {} pages ({} ok, {} failed) in {:.1}s",
            engine_state,
            stats.total,
            stats.successful,
            stats.failed,
            stats.duration().as_secs_f64()
        );

        Ok(CrawlReport {
            seed: seed_url.to_string(),
            state: engine_state,
            results,
            stats,
            executor: self.executor.stats(),
            relevance,
        })
    }
}

fn advance(state: &mut EngineState, next: EngineState) {
    debug_assert!(state.can_transition_to(next), "{} -> {}", state, next);
    debug!("Engine {} -> {}", state, next);
    *state = next;
}

fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty() && seen.insert(k.clone()))
        .collect()
}

/// Mutable state of one run, behind a single lock
struct RunState {
    frontier: Frontier,
    results: Vec<CrawlResult>,
    stats: CrawlStats,
    /// Score of every link considered in relevance mode
    link_scores: HashMap<String, f64>,
}

impl RunState {
    fn new(frontier: Frontier) -> Self {
        Self {
            frontier,
            results: Vec::new(),
            stats: CrawlStats::new(Utc::now()),
            link_scores: HashMap::new(),
        }
    }
}

/// What visiting one target produced
struct Visit {
    result: CrawlResult,
    /// Targets to enqueue, with their front-insertion flag
    discovered: Vec<(CrawlTarget, bool)>,
    scored: Vec<(String, f64)>,
}

impl Visit {
    fn failed(target: &CrawlTarget, error: &TrawlError) -> Self {
        let mut result = CrawlResult::failed(target.key(), target.depth, PageError::from(error));
        if let TrawlError::Network { status, .. } = error {
            result.status = *status;
        }
        Self {
            result,
            discovered: Vec::new(),
            scored: Vec::new(),
        }
    }
}

/// Everything the workers of one run share
struct CrawlRun {
    executor: Arc<FetchExecutor>,
    robots: Option<Arc<RobotsGuard>>,
    filter: LinkFilter,
    mode: CrawlMode,
    keywords: Vec<String>,
    crawler: CrawlerConfig,
    relevance: RelevanceConfig,
    /// Set from the first page processed, which is always the seed
    analyzer: OnceCell<RelevanceAnalyzer>,
    state: Mutex<RunState>,
    cancel: CancelHandle,
    progress: Option<ProgressCallback>,
}

impl CrawlRun {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self) -> Claim {
        self.lock().frontier.claim(self.cancel.is_cancelled())
    }

    fn complete(&self, target: CrawlTarget, visit: Visit) {
        let succeeded = visit.result.is_success();
        let message = match &visit.result.error {
            None => format!("Crawled {}", target.url),
            Some(e) => format!("Failed {}: {}", target.url, e.message),
        };

        let (done, budget) = {
            let mut state = self.lock();
            let accepted = state
                .frontier
                .complete(target.key(), succeeded, visit.discovered);
            state.link_scores.extend(visit.scored);
            state.stats.record(&visit.result);
            state.results.push(visit.result);
            debug!(
                "{}: {} new links, {} queued, {} in flight",
                target.url,
                accepted,
                state.frontier.queued(),
                state.frontier.in_flight()
            );
            (state.stats.total, state.frontier.max_pages())
        };

        self.cancel.wake.notify_waiters();
        if let Some(progress) = &self.progress {
            progress(done, budget, &message);
        }
    }

    async fn visit(&self, target: &CrawlTarget) -> Visit {
        match self.fetch_page(target).await {
            Ok(visit) => visit,
            Err(e) => {
                match e {
                    TrawlError::Disallowed { .. } => warn!("{}", e),
                    _ => error!("Failed {}: {}", target.url, e),
                }
                Visit::failed(target, &e)
            }
        }
    }

    async fn fetch_page(&self, target: &CrawlTarget) -> Result<Visit, TrawlError> {
        let url = &target.url;

        if let Some(robots) = &self.robots {
            let verdict = robots
                .check(url, self.executor.fetcher(), self.executor.limiter())
                .await;
            if let (Some(delay), Some(domain)) = (verdict.crawl_delay, extract_domain(url)) {
                self.executor.limiter().ensure_minimum_delay(&domain, delay);
            }
            if !verdict.allowed {
                return Err(TrawlError::Disallowed {
                    url: url.to_string(),
                });
            }
        }

        let response = self.executor.execute(url, target.referer()).await?;

        if !response.is_success() {
            return Err(TrawlError::Network {
                url: url.to_string(),
                status: Some(response.status),
                message: format!("HTTP {}", response.status),
            });
        }
        if !response.is_html() {
            return Err(TrawlError::Parsing {
                url: url.to_string(),
                message: format!(
                    "unsupported content type {}",
                    response.header("content-type").unwrap_or_default()
                ),
            });
        }

        let base = Url::parse(&response.final_url).unwrap_or_else(|_| url.clone());
        let page = parse_page(&response.body, &base).map_err(|e| TrawlError::Parsing {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(self.process_page(target, &response, &page))
    }

    fn process_page(
        &self,
        target: &CrawlTarget,
        response: &FetchResponse,
        page: &ParsedPage,
    ) -> Visit {
        let mut result = CrawlResult::new(target.key(), target.depth);
        result.title = page.title.clone();
        result.text_content = Some(page.truncated_text(self.crawler.content_limit));
        result.status = Some(response.status);
        result.from_cache = response.from_cache;
        result.matched_keywords = self.match_keywords(page);

        let links = unique_links(&page.links);
        result.outgoing_links = links.iter().map(|(url, _)| url.to_string()).collect();

        // Links from the deepest level are recorded but never followed
        let followable: &[(Url, &PageLink)] = if target.depth < self.crawler.max_depth {
            &links
        } else {
            &[]
        };

        let (discovered, scored) = match &self.mode {
            CrawlMode::Keyword { .. } => {
                result.relevance_score = self.keyword_score(&result.matched_keywords);
                (self.keyword_links(target, followable), Vec::new())
            }
            CrawlMode::Relevance { .. } => {
                let analyzer = self.analyzer(target, page);
                result.relevance_score = if target.depth == 0 {
                    1.0
                } else {
                    let origin = target.origin.as_ref();
                    analyzer.score(
                        &target.url,
                        origin.map(|o| o.text.as_str()),
                        origin.map(|o| o.context.as_str()),
                        Some(&page.relevance_text()),
                    )
                };
                self.relevant_links(analyzer, target, followable)
            }
        };

        info!(
            "[depth {}] {} ({} links, {} followed, score {:.2})",
            target.depth,
            target.url,
            result.outgoing_links.len(),
            discovered.len(),
            result.relevance_score
        );

        Visit {
            result,
            discovered,
            scored,
        }
    }

    fn analyzer(&self, target: &CrawlTarget, page: &ParsedPage) -> &RelevanceAnalyzer {
        self.analyzer.get_or_init(|| {
            let mut baseline = RelevanceBaseline::from_page(&target.url, &page.relevance_text());
            baseline.extend_keywords(&self.keywords);
            info!(
                "Relevance baseline from {}: {} keywords",
                target.url,
                baseline.keywords.len()
            );
            RelevanceAnalyzer::with_baseline(self.relevance.similarity_threshold, baseline)
        })
    }

    fn match_keywords(&self, page: &ParsedPage) -> Vec<String> {
        if self.keywords.is_empty() {
            return Vec::new();
        }
        let haystack = format!(
            "{} {}",
            page.title.as_deref().unwrap_or_default(),
            page.text
        )
        .to_lowercase();
        self.keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .cloned()
            .collect()
    }

    /// Share of the requested keywords found on the page
    fn keyword_score(&self, matched: &[String]) -> f64 {
        if self.keywords.is_empty() {
            0.0
        } else {
            matched.len() as f64 / self.keywords.len() as f64
        }
    }

    fn accepted<'a>(
        &'a self,
        links: &'a [(Url, &'a PageLink)],
    ) -> impl Iterator<Item = &'a (Url, &'a PageLink)> + 'a {
        links.iter().filter(|(url, _)| match self.filter.check(url) {
            Ok(()) => true,
            Err(reason) => {
                debug!("Skipping {}: {}", url, reason);
                false
            }
        })
    }

    fn keyword_links(
        &self,
        target: &CrawlTarget,
        links: &[(Url, &PageLink)],
    ) -> Vec<(CrawlTarget, bool)> {
        self.accepted(links)
            .take(self.crawler.max_links_per_page)
            .map(|(url, link)| (child(target, url, link), false))
            .collect()
    }

    /// Scores accepted links; keeps the best ones at or above the minimum
    fn relevant_links(
        &self,
        analyzer: &RelevanceAnalyzer,
        target: &CrawlTarget,
        links: &[(Url, &PageLink)],
    ) -> (Vec<(CrawlTarget, bool)>, Vec<(String, f64)>) {
        let mut scored = Vec::new();
        let mut relevant = Vec::new();

        for (url, link) in self.accepted(links) {
            let text = Some(link.text.as_str()).filter(|t| !t.is_empty());
            let context = Some(link.context.as_str()).filter(|c| !c.is_empty());
            let score = analyzer.score(url, text, context, None);
            scored.push((url.to_string(), score));

            if score >= self.relevance.min_relevance_score {
                relevant.push((child(target, url, link), score));
            } else {
                debug!("Not following {} (score {:.2})", url, score);
            }
        }

        relevant.sort_by(|a, b| b.1.total_cmp(&a.1));
        relevant.truncate(self.relevance.max_links_per_page);

        // Front insertions are pushed lowest first so the best link ends up
        // at the head of the queue
        let (front, back): (Vec<_>, Vec<_>) = relevant.into_iter().partition(|(_, score)| {
            self.relevance.prioritize_high_relevance
                && *score >= self.relevance.high_relevance_threshold
        });
        let discovered = front
            .into_iter()
            .rev()
            .map(|(t, _)| (t, true))
            .chain(back.into_iter().map(|(t, _)| (t, false)))
            .collect();

        (discovered, scored)
    }
}

fn child(parent: &CrawlTarget, url: &Url, link: &PageLink) -> CrawlTarget {
    CrawlTarget {
        url: url.clone(),
        depth: parent.depth + 1,
        origin: Some(LinkOrigin {
            text: link.text.clone(),
            context: link.context.clone(),
            referer: parent.url.to_string(),
        }),
    }
}

/// Normalizes links, dropping duplicates and anything unparseable
fn unique_links(links: &[PageLink]) -> Vec<(Url, &PageLink)> {
    let mut seen = HashSet::new();
    links
        .iter()
        .filter_map(|link| match normalize_url(link.url.as_str()) {
            Ok(url) => Some((url, link)),
            Err(e) => {
                debug!("Dropping link {}: {}", link.url, e);
                None
            }
        })
        .filter(|(url, _)| seen.insert(url.as_str().to_string()))
        .collect()
}

async fn worker(run: Arc<CrawlRun>, id: usize) {
    debug!("Worker {} started", id);
    loop {
        // Registered before claiming so a completion between the claim and
        // the await is not missed
        let notified = run.cancel.wake.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        match run.claim() {
            Claim::Target(target) => {
                let visit = run.visit(&target).await;
                run.complete(target, visit);
            }
            Claim::Wait => notified.await,
            Claim::Done => break,
        }
    }
    debug!("Worker {} finished", id);
}

async fn run_worker_pool(run: Arc<CrawlRun>, workers: usize) -> Result<(), TrawlError> {
    let mut pool = JoinSet::new();
    for id in 0..workers {
        pool.spawn(worker(Arc::clone(&run), id));
    }

    while let Some(joined) = pool.join_next().await {
        joined.map_err(|e| TrawlError::Runtime(format!("crawl worker failed: {}", e)))?;
    }
    Ok(())
}

async fn visit_with_permit(
    run: Arc<CrawlRun>,
    target: CrawlTarget,
    _permit: OwnedSemaphorePermit,
) -> (CrawlTarget, Visit) {
    let visit = run.visit(&target).await;
    (target, visit)
}

async fn run_cooperative(run: Arc<CrawlRun>, max_in_flight: usize) {
    let permits = Arc::new(Semaphore::new(max_in_flight));
    let mut in_flight = FuturesUnordered::new();

    loop {
        while let Ok(permit) = Arc::clone(&permits).try_acquire_owned() {
            match run.claim() {
                Claim::Target(target) => {
                    in_flight.push(visit_with_permit(Arc::clone(&run), target, permit))
                }
                Claim::Wait | Claim::Done => break,
            }
        }

        match in_flight.next().await {
            Some((target, visit)) => run.complete(target, visit),
            None => break,
        }
    }
}
