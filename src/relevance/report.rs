use serde::Serialize;

const REPORT_LIST_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredUrl {
    pub url: String,
    pub score: f64,
}

/// Summary of the scores assigned during a relevance-guided crawl
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelevanceReport {
    pub total_analyzed: usize,
    pub average_score: f64,
    pub min_score: f64,
    pub max_score: f64,
    pub above_threshold: usize,
    pub threshold: f64,
    pub top: Vec<ScoredUrl>,
    pub bottom: Vec<ScoredUrl>,
}

impl RelevanceReport {
    pub fn from_scores<I>(scores: I, threshold: f64) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut scored: Vec<ScoredUrl> = scores
            .into_iter()
            .map(|(url, score)| ScoredUrl { url, score })
            .collect();

        if scored.is_empty() {
            return Self {
                threshold,
                ..Self::default()
            };
        }

        // Highest first; URL breaks ties so the report is stable
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.url.cmp(&b.url)));

        let total = scored.len();
        let sum: f64 = scored.iter().map(|s| s.score).sum();

        Self {
            total_analyzed: total,
            average_score: sum / total as f64,
            min_score: scored[total - 1].score,
            max_score: scored[0].score,
            above_threshold: scored.iter().filter(|s| s.score >= threshold).count(),
            threshold,
            top: scored.iter().take(REPORT_LIST_LEN).cloned().collect(),
            bottom: scored.iter().rev().take(REPORT_LIST_LEN).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_analyzed == 0
    }
}
