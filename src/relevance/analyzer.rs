use crate::relevance::keywords::{coverage, extract_keywords, jaccard};
use crate::relevance::text::PageText;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, info};
use url::Url;

const PATH_WEIGHT: f64 = 0.2;
const DOMAIN_WEIGHT: f64 = 0.1;
const LINK_TEXT_WEIGHT: f64 = 0.3;
const CONTEXT_WEIGHT: f64 = 0.2;
const CONTENT_WEIGHT: f64 = 0.2;

const UNRELATED_PENALTY: f64 = 0.1;
const NAVIGATION_PENALTY: f64 = 0.5;

/// Score given to path similarity when either side is the site root
const NEUTRAL_PATH_SCORE: f64 = 0.5;

/// URL patterns for pages that are almost never topical content
static UNRELATED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"/privacy[-_]?policy",
        r"/terms[-_]?(of[-_]?use|and[-_]?conditions)?",
        r"/cookie[-_]?policy",
        r"/contact[-_]?us?",
        r"/about[-_]?us?",
        r"/careers?",
        r"/jobs?",
        r"/advertise",
        r"/ads?/",
        r"/login",
        r"/signin",
        r"/signup",
        r"/register",
        r"/logout",
        r"/cart",
        r"/checkout",
        r"/share",
        r"/print",
        r"/email",
        r"/(twitter|facebook|linkedin|instagram|youtube)\.com",
        r"/rss",
        r"/feed",
        r"#comments?",
        r"\.(pdf|doc|docx|xls|xlsx|ppt|pptx|zip|rar)$",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Link-text words that mark site chrome rather than content
const NAVIGATION_WORDS: &[&str] = &[
    "home",
    "menu",
    "navigation",
    "footer",
    "header",
    "sidebar",
    "copyright",
    "legal",
    "disclaimer",
    "accessibility",
    "sitemap",
    "help",
    "support",
    "faq",
    "social",
    "follow",
    "share",
    "subscribe",
];

pub fn is_unrelated_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    UNRELATED_PATTERNS.iter().any(|re| re.is_match(&lower))
}

pub fn is_navigation_text(text: &str) -> bool {
    text.to_lowercase()
        .split_whitespace()
        .any(|word| NAVIGATION_WORDS.contains(&word))
}

fn path_tokens(url: &Url) -> Vec<String> {
    url.path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// What the crawl considers "on topic", derived once from the seed page
#[derive(Debug, Clone, Default)]
pub struct RelevanceBaseline {
    pub keywords: HashSet<String>,
    pub path_tokens: Vec<String>,
    pub domain: String,
}

impl RelevanceBaseline {
    pub fn from_page(url: &Url, page: &PageText) -> Self {
        let mut keywords = extract_keywords(&page.body);
        if let Some(title) = &page.title {
            keywords.extend(extract_keywords(title));
        }
        for heading in &page.headings {
            keywords.extend(extract_keywords(heading));
        }
        keywords.extend(page.meta_keywords.iter().cloned());
        if let Some(description) = &page.meta_description {
            keywords.extend(extract_keywords(description));
        }

        Self {
            keywords,
            path_tokens: path_tokens(url),
            domain: url.host_str().unwrap_or_default().to_lowercase(),
        }
    }

    /// Adds caller-supplied topic words
    pub fn extend_keywords<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for word in words {
            let word = word.as_ref().trim().to_lowercase();
            if !word.is_empty() {
                self.keywords.insert(word);
            }
        }
    }
}

/// Scores candidate links and pages against the seed topic
#[derive(Debug, Clone)]
pub struct RelevanceAnalyzer {
    similarity_threshold: f64,
    baseline: RelevanceBaseline,
}

impl RelevanceAnalyzer {
    pub fn new(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold: similarity_threshold.clamp(0.0, 1.0),
            baseline: RelevanceBaseline::default(),
        }
    }

    pub fn with_baseline(similarity_threshold: f64, baseline: RelevanceBaseline) -> Self {
        Self {
            baseline,
            ..Self::new(similarity_threshold)
        }
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    pub fn baseline(&self) -> &RelevanceBaseline {
        &self.baseline
    }

    pub fn baseline_mut(&mut self) -> &mut RelevanceBaseline {
        &mut self.baseline
    }

    /// Establishes the baseline from the seed page, replacing any previous one
    pub fn analyze_seed(&mut self, url: &Url, html: &str) -> &RelevanceBaseline {
        let page = PageText::from_html(html);
        self.baseline = RelevanceBaseline::from_page(url, &page);

        info!(
            "Relevance baseline for {}: {} keywords",
            url,
            self.baseline.keywords.len()
        );
        debug!(
            "Sample keywords: {:?}",
            self.baseline.keywords.iter().take(10).collect::<Vec<_>>()
        );

        &self.baseline
    }

    /// Relevance of `url` in [0, 1]
    ///
    /// Signals that are absent (no link text, no context, page not fetched)
    /// are left out and the remaining weights renormalized.
    pub fn score(
        &self,
        url: &Url,
        link_text: Option<&str>,
        context: Option<&str>,
        page: Option<&PageText>,
    ) -> f64 {
        let weighted = self.weighted_score(url, link_text, context, page);
        (weighted * self.penalty(url, link_text)).clamp(0.0, 1.0)
    }

    pub fn is_relevant(
        &self,
        url: &Url,
        link_text: Option<&str>,
        context: Option<&str>,
        page: Option<&PageText>,
    ) -> bool {
        self.score(url, link_text, context, page) >= self.similarity_threshold
    }

    /// Score before pattern penalties
    pub fn weighted_score(
        &self,
        url: &Url,
        link_text: Option<&str>,
        context: Option<&str>,
        page: Option<&PageText>,
    ) -> f64 {
        let mut signals = vec![
            (self.path_similarity(url), PATH_WEIGHT),
            (self.domain_similarity(url), DOMAIN_WEIGHT),
        ];

        if let Some(text) = link_text.filter(|t| !t.trim().is_empty()) {
            signals.push((self.text_similarity(text), LINK_TEXT_WEIGHT));
        }
        if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
            signals.push((self.text_similarity(context), CONTEXT_WEIGHT));
        }
        if let Some(page) = page {
            signals.push((self.content_similarity(page), CONTENT_WEIGHT));
        }

        let total_weight: f64 = signals.iter().map(|(_, w)| w).sum();
        signals.iter().map(|(s, w)| s * w / total_weight).sum()
    }

    /// Multiplier for known non-content URLs and navigation link text
    pub fn penalty(&self, url: &Url, link_text: Option<&str>) -> f64 {
        let mut penalty = 1.0;
        if is_unrelated_url(url.as_str()) {
            penalty *= UNRELATED_PENALTY;
        }
        if link_text.is_some_and(is_navigation_text) {
            penalty *= NAVIGATION_PENALTY;
        }
        penalty
    }

    fn path_similarity(&self, url: &Url) -> f64 {
        let tokens = path_tokens(url);
        let seed = &self.baseline.path_tokens;
        if tokens.is_empty() || seed.is_empty() {
            return NEUTRAL_PATH_SCORE;
        }

        let seed_set: HashSet<&String> = seed.iter().collect();
        let common = tokens
            .iter()
            .collect::<HashSet<_>>()
            .intersection(&seed_set)
            .count();
        if common > 0 {
            return common as f64 / tokens.len().max(seed.len()) as f64;
        }

        strsim::normalized_levenshtein(&seed.join("/"), &tokens.join("/"))
    }

    fn domain_similarity(&self, url: &Url) -> f64 {
        let seed = self.baseline.domain.as_str();
        let Some(host) = url.host_str().map(str::to_lowercase) else {
            return 0.0;
        };
        if seed.is_empty() {
            return 0.0;
        }

        if host == seed {
            1.0
        } else if host.ends_with(&format!(".{}", seed)) {
            0.8
        } else if seed.ends_with(&format!(".{}", host)) {
            0.7
        } else if same_base_domain(&host, seed) {
            0.5
        } else {
            0.0
        }
    }

    fn text_similarity(&self, text: &str) -> f64 {
        jaccard(&extract_keywords(text), &self.baseline.keywords)
    }

    /// Title, headings, and body overlap with the seed keywords, weighted 3:2:1
    fn content_similarity(&self, page: &PageText) -> f64 {
        let seed = &self.baseline.keywords;
        let body = extract_keywords(&page.body);
        if body.is_empty() {
            return 0.0;
        }

        let mut score = 0.0;
        let mut weight = 0.0;

        if let Some(title) = &page.title {
            score += coverage(&extract_keywords(title), seed) * 3.0;
            weight += 3.0;
        }

        let headings: HashSet<String> = page
            .headings
            .iter()
            .flat_map(|h| extract_keywords(h))
            .collect();
        if !headings.is_empty() {
            score += coverage(&headings, seed) * 2.0;
            weight += 2.0;
        }

        score += coverage(&body, seed);
        weight += 1.0;

        score / weight
    }
}

fn same_base_domain(a: &str, b: &str) -> bool {
    let a: Vec<&str> = a.rsplit('.').take(2).collect();
    let b: Vec<&str> = b.rsplit('.').take(2).collect();
    a.len() == 2 && a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED_HTML: &str = r#"<html>
        <head>
            <title>Basketball News</title>
            <meta name="keywords" content="basketball, nba">
        </head>
        <body>
            <h1>Latest basketball scores</h1>
            <p>Lakers defeat Celtics in overtime thriller. Playoff standings update.</p>
        </body>
    </html>"#;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn analyzer() -> RelevanceAnalyzer {
        let mut analyzer = RelevanceAnalyzer::new(0.3);
        analyzer.analyze_seed(&url("https://example.com/sports/basketball"), SEED_HTML);
        analyzer
    }

    #[test]
    fn test_analyze_seed_collects_keywords() {
        let analyzer = analyzer();
        let baseline = analyzer.baseline();
        assert_eq!(baseline.domain, "example.com");
        assert_eq!(baseline.path_tokens, vec!["sports", "basketball"]);
        for word in ["basketball", "nba", "lakers", "celtics", "scores", "playoff"] {
            assert!(baseline.keywords.contains(word), "missing {}", word);
        }
    }

    #[test]
    fn test_domain_similarity() {
        let analyzer = analyzer();
        assert_eq!(analyzer.domain_similarity(&url("https://example.com/x")), 1.0);
        assert_eq!(analyzer.domain_similarity(&url("https://news.example.com/x")), 0.8);
        assert_eq!(analyzer.domain_similarity(&url("https://other.org/x")), 0.0);

        let mut sub = RelevanceAnalyzer::new(0.3);
        sub.analyze_seed(&url("https://blog.example.com/"), SEED_HTML);
        assert_eq!(sub.domain_similarity(&url("https://example.com/")), 0.7);
        assert_eq!(sub.domain_similarity(&url("https://shop.example.com/")), 0.5);
    }

    #[test]
    fn test_path_similarity() {
        let analyzer = analyzer();
        assert_eq!(
            analyzer.path_similarity(&url("https://example.com/sports/basketball/lakers")),
            2.0 / 3.0
        );
        assert_eq!(analyzer.path_similarity(&url("https://example.com/")), 0.5);
        let unrelated = analyzer.path_similarity(&url("https://example.com/zzzz"));
        assert!((0.0..0.5).contains(&unrelated));
    }

    #[test]
    fn test_score_bounds() {
        let analyzer = analyzer();
        let cases = [
            ("https://example.com/sports/basketball/lakers", Some("Lakers basketball scores")),
            ("https://other.org/", None),
            ("https://example.com/login", Some("Home")),
            ("https://example.com/a/b/c/d/e", Some("")),
        ];
        for (candidate, text) in cases {
            let score = analyzer.score(&url(candidate), text, Some("basketball"), None);
            assert!((0.0..=1.0).contains(&score), "{} scored {}", candidate, score);
        }
    }

    #[test]
    fn test_on_topic_link_outscores_off_topic() {
        let analyzer = analyzer();
        let on_topic = analyzer.score(
            &url("https://example.com/sports/basketball/playoffs"),
            Some("Playoff standings and basketball scores"),
            None,
            None,
        );
        let off_topic = analyzer.score(
            &url("https://example.com/recipes/soup"),
            Some("Tomato soup recipe"),
            None,
            None,
        );
        assert!(on_topic > off_topic);
        assert!(analyzer.is_relevant(
            &url("https://example.com/sports/basketball/playoffs"),
            Some("Playoff standings and basketball scores"),
            None,
            None,
        ));
    }

    #[test]
    fn test_unrelated_pattern_penalty() {
        let analyzer = analyzer();
        let target = url("https://example.com/privacy-policy");
        let raw = analyzer.weighted_score(&target, Some("Basketball privacy"), None, None);
        let penalized = analyzer.score(&target, Some("Basketball privacy"), None, None);
        assert!(penalized <= raw * 0.1 + 1e-12);
        assert!(is_unrelated_url("https://example.com/files/report.PDF"));
        assert!(!is_unrelated_url("https://example.com/news/a"));
    }

    #[test]
    fn test_navigation_text_penalty() {
        let analyzer = analyzer();
        let target = url("https://example.com/sports/basketball/scores");
        assert_eq!(analyzer.penalty(&target, Some("Back to Home")), 0.5);
        assert_eq!(analyzer.penalty(&target, Some("Lakers scores")), 1.0);
    }

    #[test]
    fn test_page_content_signal() {
        let analyzer = analyzer();
        let target = url("https://example.com/sports/basketball/recap");
        let on_topic = PageText::from_html(
            "<title>Basketball recap</title><h1>Lakers and Celtics</h1><p>NBA playoff basketball scores</p>",
        );
        let off_topic = PageText::from_html("<title>Gardening</title><p>Tomatoes need sun</p>");
        let high = analyzer.score(&target, None, None, Some(&on_topic));
        let low = analyzer.score(&target, None, None, Some(&off_topic));
        assert!(high > low);
    }

    #[test]
    fn test_without_baseline() {
        let analyzer = RelevanceAnalyzer::new(0.3);
        let score = analyzer.score(&url("https://example.com/a"), Some("anything"), None, None);
        // Only the neutral path signal contributes
        assert!((score - NEUTRAL_PATH_SCORE * PATH_WEIGHT / 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_extend_keywords() {
        let mut analyzer = RelevanceAnalyzer::new(0.3);
        analyzer.baseline_mut().extend_keywords(["  Hockey ", ""]);
        assert!(analyzer.baseline().keywords.contains("hockey"));
        assert_eq!(analyzer.baseline().keywords.len(), 1);
    }
}
