use once_cell::sync::Lazy;
use regex::Regex;

use super::parse::Parsed;

const MIN_TITLE_LEN: usize = 10;
const MIN_BODY_LEN: usize = 200;
const MIN_WORDS: usize = 20;
const MIN_AVG_WORD_LEN: f64 = 3.0;
const MAX_AVG_WORD_LEN: f64 = 12.0;
const MIN_ARTICLE_PATTERNS: usize = 2;

static HARD_FRAGMENT_MARKERS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "function(", "var ", "document.getelementbyid", "share on facebook",
        "follow us on twitter", "click here to", "accept cookies", "enable javascript",
    ]
});

/// Reporting verbs, proper-noun markers, and year mentions: any presence
/// counts as one "article-like" pattern toward the §4.2 quality gate.
static REPORTING_VERB: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(said|reported|announced|according to|confirmed|told)\b").unwrap());
static PROPER_NOUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z][a-z]{2,}\s+[A-Z][a-z]{2,}\b").unwrap());
static YEAR_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

/// Rejects a fast-extracted result as "not meaningful" per §4.2 Step 2.
/// Returns `true` when the extraction passes (is meaningful).
pub fn passes_quality_gate(parsed: &Parsed) -> bool {
    if parsed.title.len() < MIN_TITLE_LEN {
        return false;
    }
    if parsed.body.len() < MIN_BODY_LEN {
        return false;
    }

    let words: Vec<&str> = parsed.body.split_whitespace().collect();
    if words.len() < MIN_WORDS {
        return false;
    }

    let avg_word_len = words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64;
    if !(MIN_AVG_WORD_LEN..=MAX_AVG_WORD_LEN).contains(&avg_word_len) {
        return false;
    }

    let lowercase_body = parsed.body.to_lowercase();
    if HARD_FRAGMENT_MARKERS.iter().any(|m| lowercase_body.contains(m)) {
        return false;
    }

    let pattern_hits = [
        REPORTING_VERB.is_match(&parsed.body),
        PROPER_NOUN.is_match(&parsed.body),
        YEAR_MENTION.is_match(&parsed.body),
    ]
    .into_iter()
    .filter(|hit| *hit)
    .count();

    pattern_hits >= MIN_ARTICLE_PATTERNS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(title: &str, body: &str) -> Parsed {
        Parsed {
            title: title.to_string(),
            description: None,
            body: body.to_string(),
        }
    }

    #[test]
    fn rejects_short_body() {
        assert!(!passes_quality_gate(&parsed("A reasonably long headline", "Too short.")));
    }

    #[test]
    fn rejects_hard_fragment_markers() {
        let body = "a".repeat(250) + " function() { document.getElementById('x'); } said reported 2024 John Smith";
        assert!(!passes_quality_gate(&parsed("A reasonably long headline", &body)));
    }

    #[test]
    fn accepts_article_like_text() {
        let body = "Officials said the storm reached Michigan on Tuesday in 2024. \
            Jane Anderson, a spokesperson, confirmed the damage assessment continues. \
            The governor announced additional relief funding for affected counties this week.";
        assert!(passes_quality_gate(&parsed("Storm Damage Assessment Continues in Michigan", body)));
    }
}
