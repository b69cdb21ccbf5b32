use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

const TITLE_MAX_CHARS: usize = 80;
const EXCERPT_WORD_BUDGET: usize = 150;

static METADATA_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(photo|image)\s*(credit|courtesy)|^by\s+[a-z]|subscribe|follow us|share this").unwrap()
});
static CAPITALIZED_MULTIWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b").unwrap());
static NUMERIC_FACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(\.\d+)?\b").unwrap());
static EVENT_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(killed|injured|died|wounded|arrested|crash|attack|ceasefire|election|earthquake|flood|evacuation)\b").unwrap()
});

fn sentences(body: &str) -> Vec<&str> {
    body.unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// First non-metadata sentence, truncated and punctuation-normalized, per
/// §4.3 Step 3. Falls back to the original title, then a fixed string.
pub fn generate_title(body: &str, original_title: Option<&str>) -> String {
    for sentence in sentences(body) {
        if METADATA_MARKER.is_match(sentence) {
            continue;
        }
        let truncated = truncate_chars(sentence, TITLE_MAX_CHARS);
        let normalized = normalize_terminal_punctuation(&truncated, false);
        if normalized.len() >= 10 {
            return normalized;
        }
    }

    if let Some(title) = original_title {
        let trimmed = title.trim();
        if trimmed.len() >= 10 {
            return truncate_chars(trimmed, TITLE_MAX_CHARS);
        }
    }

    "News Update".to_string()
}

/// Concatenates top-ranked sentences until the word budget is reached.
/// Ranking prefers event keywords, named entities, and numeric facts;
/// rejects sentences containing metadata markers.
pub fn generate_excerpt(body: &str, _original_title: Option<&str>) -> String {
    let mut candidates: Vec<(&str, i32)> = sentences(body)
        .into_iter()
        .filter(|s| !METADATA_MARKER.is_match(s))
        .map(|s| (s, score_sentence(s)))
        .collect();

    candidates.sort_by(|a, b| b.1.cmp(&a.1));

    let mut word_count = 0usize;
    let mut picked = Vec::new();
    for (sentence, _) in candidates {
        let words = sentence.unicode_words().count();
        if word_count > 0 && word_count + words > EXCERPT_WORD_BUDGET + 40 {
            continue;
        }
        picked.push(sentence);
        word_count += words;
        if word_count >= EXCERPT_WORD_BUDGET {
            break;
        }
    }

    if picked.is_empty() {
        return normalize_terminal_punctuation(&truncate_chars(body, 600), true);
    }

    let joined = picked.join(" ");
    normalize_terminal_punctuation(&joined, true)
}

fn score_sentence(sentence: &str) -> i32 {
    let mut score = 0;
    if EVENT_KEYWORD.is_match(sentence) {
        score += 3;
    }
    score += CAPITALIZED_MULTIWORD.find_iter(sentence).count() as i32;
    if NUMERIC_FACT.is_match(sentence) {
        score += 1;
    }
    score
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect::<String>().trim().to_string()
}

fn normalize_terminal_punctuation(text: &str, keep_period: bool) -> String {
    let trimmed = text.trim().trim_end_matches(|c: char| c == ',' || c == ';');
    if trimmed.ends_with('.') || trimmed.ends_with('!') || trimmed.ends_with('?') {
        trimmed.to_string()
    } else if keep_period {
        format!("{trimmed}.")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_non_metadata_sentence_as_title() {
        let body = "Photo credit: Jane Doe. Officials confirmed the bridge collapse in Ohio on Monday.";
        let title = generate_title(body, None);
        assert!(title.starts_with("Officials confirmed"));
    }

    #[test]
    fn falls_back_to_original_title_when_body_has_no_sentence() {
        let title = generate_title("", Some("A Reasonably Long Original Title"));
        assert_eq!(title, "A Reasonably Long Original Title");
    }

    #[test]
    fn falls_back_to_news_update_when_nothing_usable() {
        assert_eq!(generate_title("", None), "News Update");
    }

    #[test]
    fn excerpt_has_terminal_punctuation() {
        let body = "Officials said the storm caused significant flooding across the region. \
            The governor announced relief funding of 2 million dollars for Ohio residents this week.";
        let excerpt = generate_excerpt(body, None);
        assert!(excerpt.ends_with('.') || excerpt.ends_with('!') || excerpt.ends_with('?'));
    }
}
