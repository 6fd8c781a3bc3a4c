use std::collections::HashSet;

/// English stopwords that never count as keywords
///
/// Only words of three or more characters are listed; shorter tokens are
/// rejected by length before the stopword check.
const STOPWORDS: &[&str] = &[
    "about", "above", "after", "again", "against", "all", "and", "any", "are", "aren", "arent",
    "because", "been", "before", "being", "below", "between", "both", "but", "can", "couldn",
    "couldnt", "did", "didn", "didnt", "does", "doesn", "doesnt", "doing", "don", "dont", "down",
    "during", "each", "few", "for", "from", "further", "had", "hadn", "hadnt", "has", "hasn",
    "hasnt", "have", "haven", "havent", "having", "her", "here", "hers", "herself", "him",
    "himself", "his", "how", "into", "isn", "isnt", "its", "itself", "just", "mightn", "more",
    "most", "mustn", "myself", "needn", "nor", "not", "now", "off", "once", "only", "other",
    "our", "ours", "ourselves", "out", "over", "own", "same", "shan", "she", "shes", "should",
    "shouldn", "shouldnt", "shouldve", "some", "such", "than", "that", "thatll", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those", "through",
    "too", "under", "until", "very", "was", "wasn", "wasnt", "were", "weren", "werent", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "won", "wont",
    "wouldn", "wouldnt", "you", "youd", "youll", "your", "youre", "yours", "yourself",
    "yourselves", "youve",
];

/// Minimum keyword length in characters
pub const MIN_KEYWORD_LEN: usize = 3;

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.binary_search(&word).is_ok()
}

/// Extracts the keyword set of a piece of text
///
/// Text is lowercased and stripped of ASCII punctuation before splitting on
/// whitespace. Tokens shorter than three characters, stopwords, and purely
/// numeric tokens are dropped.
pub fn extract_keywords(text: &str) -> HashSet<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| token.chars().count() >= MIN_KEYWORD_LEN)
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
        .filter(|token| !is_stopword(token))
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of two keyword sets; zero when either is empty
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Fraction of `reference` covered by `candidate`
pub fn coverage(candidate: &HashSet<String>, reference: &HashSet<String>) -> f64 {
    if reference.is_empty() {
        return 0.0;
    }
    candidate.intersection(reference).count() as f64 / reference.len() as f64
}
