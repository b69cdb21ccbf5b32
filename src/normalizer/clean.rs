use once_cell::sync::Lazy;
use regex::Regex;

static CHAT_PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(sure,?\s*here\s*(is|'s)[^:\n]*:?|headline:|title:|excerpt:|here\s+is\s+a\s+neutral[^:\n]*:?)\s*")
        .unwrap()
});
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[a-zA-Z]*\n?|```").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static CSS_BRACE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^{}]*\}").unwrap());
static MARKDOWN_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#+\s*").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const REFUSAL_MARKERS: &[&str] = &["cannot", "unable", "inappropriate", "i'm sorry", "as an ai"];
const BANNED_PATTERNS: &[&str] = &["{", "}", "```", "<style", "<script", "selector {"];

/// Strips chat preamble, code fences, HTML, CSS leftovers, markdown headers
/// and wrapping quotes from a raw model response, per §4.3 Step 1.
pub fn clean_model_output(raw: &str) -> String {
    let mut text = raw.trim().to_string();
    text = CHAT_PREAMBLE.replace(&text, "").to_string();
    text = CODE_FENCE.replace_all(&text, "").to_string();
    text = HTML_TAG.replace_all(&text, "").to_string();
    text = CSS_BRACE_BLOCK.replace_all(&text, "").to_string();
    text = MARKDOWN_HEADER.replace_all(&text, "").to_string();
    text = WHITESPACE.replace_all(&text, " ").trim().to_string();

    let trimmed = text.trim_matches(|c| c == '"' || c == '\'' || c == '“' || c == '”');
    trimmed.to_string()
}

/// §4.3 Step 2: rejects output containing refusal language or obvious
/// leftover code/stylesheet fragments.
pub fn is_valid_model_output(text: &str, min_len: usize, max_len: usize) -> bool {
    if text.len() < min_len || text.len() > max_len {
        return false;
    }
    let lower = text.to_lowercase();
    if REFUSAL_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }
    if BANNED_PATTERNS.iter().any(|p| text.contains(p)) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_chat_preamble_and_quotes() {
        let raw = "Sure, here is a neutral headline: \"Storm Damages Michigan Towns\"";
        assert_eq!(clean_model_output(raw), "Storm Damages Michigan Towns");
    }

    #[test]
    fn strips_code_fences_and_html() {
        let raw = "```\n<b>Flooding Hits Coastal Region</b>\n```";
        assert_eq!(clean_model_output(raw), "Flooding Hits Coastal Region");
    }

    #[test]
    fn rejects_refusal_language() {
        assert!(!is_valid_model_output("I'm sorry, I cannot help with that request text here", 10, 100));
    }

    #[test]
    fn rejects_leftover_css() {
        assert!(!is_valid_model_output(".selector { color: red; } more text here", 10, 100));
    }

    #[test]
    fn accepts_clean_neutral_text() {
        assert!(is_valid_model_output("Storm Damages Several Towns in Michigan", 10, 100));
    }
}
