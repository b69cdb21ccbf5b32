use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

static TOKEN_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9']+").unwrap());

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "if", "then", "else", "of", "to", "in", "on", "for",
        "with", "at", "by", "from", "up", "about", "into", "over", "after", "is", "are", "was",
        "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will", "would",
        "could", "should", "this", "that", "these", "those", "it", "its", "as", "not", "no",
        "he", "she", "they", "we", "you", "i", "his", "her", "their", "our", "your",
    ]
    .into_iter()
    .collect()
});

fn stem_tokens(text: &str) -> Vec<String> {
    let stemmer = Stemmer::create(Algorithm::English);
    TOKEN_SPLIT
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str())
        .filter(|t| !STOPWORDS.contains(t) && t.len() > 1)
        .map(|t| stemmer.stem(t).to_string())
        .collect()
}

/// Unigrams through trigrams over stemmed, stop-word-filtered tokens.
fn ngrams(tokens: &[String]) -> Vec<String> {
    let mut grams = Vec::with_capacity(tokens.len() * 3);
    for n in 1..=3 {
        if tokens.len() < n {
            continue;
        }
        for window in tokens.windows(n) {
            grams.push(window.join("_"));
        }
    }
    grams
}

fn term_frequencies(grams: &[String]) -> HashMap<String, f64> {
    let mut counts: HashMap<String, f64> = HashMap::new();
    for g in grams {
        *counts.entry(g.clone()).or_insert(0.0) += 1.0;
    }
    let total: f64 = counts.values().sum();
    if total > 0.0 {
        for v in counts.values_mut() {
            *v /= total;
        }
    }
    counts
}

/// Builds TF-IDF vectors for a batch of documents, corpus-relative to that
/// batch — the Clusterer rebuilds this per `cluster()` call so it stays
/// stateless across concurrent callers (§5).
pub fn tfidf_vectors(documents: &[&str]) -> Vec<HashMap<String, f64>> {
    let doc_grams: Vec<Vec<String>> = documents.iter().map(|d| ngrams(&stem_tokens(d))).collect();
    let doc_freqs: Vec<HashMap<String, f64>> = doc_grams.iter().map(|g| term_frequencies(g)).collect();

    let n_docs = documents.len() as f64;
    let mut df: HashMap<&str, f64> = HashMap::new();
    for freqs in &doc_freqs {
        for term in freqs.keys() {
            *df.entry(term.as_str()).or_insert(0.0) += 1.0;
        }
    }

    doc_freqs
        .into_iter()
        .map(|freqs| {
            freqs
                .into_iter()
                .map(|(term, tf)| {
                    let idf = (n_docs / (1.0 + df.get(term.as_str()).copied().unwrap_or(1.0))).ln() + 1.0;
                    (term, tf * idf)
                })
                .collect()
        })
        .collect()
}

pub fn cosine(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f32 {
    let mut dot = 0.0;
    for (term, weight_a) in a {
        if let Some(weight_b) = b.get(term) {
            dot += weight_a * weight_b;
        }
    }
    let norm_a = a.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_b = b.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f32
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Sequence-ratio similarity of lowercased titles, per §4.4 Step 4's
/// `title_similarity` gate.
pub fn title_similarity(a: &str, b: &str) -> f32 {
    strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()) as f32
}

pub fn content_tokens(text: &str) -> HashSet<String> {
    stem_tokens(text).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_documents_have_cosine_one() {
        let docs = ["Officials reported a bridge collapse in Ohio.", "A different unrelated story about weather patterns."];
        let vectors = tfidf_vectors(&docs);
        assert!((cosine(&vectors[0], &vectors[0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unrelated_documents_have_low_cosine() {
        let docs = [
            "Officials reported a bridge collapse in Ohio on Monday.",
            "The championship game ended with a dramatic overtime victory.",
        ];
        let vectors = tfidf_vectors(&docs);
        assert!(cosine(&vectors[0], &vectors[1]) < 0.3);
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        let set: HashSet<String> = ["united kingdom".to_string(), "shooting".to_string()].into_iter().collect();
        assert_eq!(jaccard(&set, &set), 1.0);
    }

    #[test]
    fn title_similarity_detects_near_duplicates() {
        let sim = title_similarity("Storm hits Michigan towns", "Storm hits Michigan town");
        assert!(sim > 0.9);
    }
}
