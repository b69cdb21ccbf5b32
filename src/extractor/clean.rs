use once_cell::sync::Lazy;
use regex::Regex;

/// Boilerplate patterns stripped from extracted body text: ad markers,
/// share/follow prompts, copyright lines, video timestamps, byline noise.
static BOILERPLATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^advertisement$",
        r"(?i)^sponsored content$",
        r"(?i)^share this (article|story)",
        r"(?i)^follow us on",
        r"(?i)^subscribe (to|for) our newsletter",
        r"(?i)^\s*©\s*\d{4}",
        r"(?i)all rights reserved\.?$",
        r"^\d{1,2}:\d{2}(:\d{2})?\s*$",
        r"(?i)^(photo|image) (credit|courtesy)",
        r"(?i)^read more:?",
        r"(?i)^related (articles|stories):?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static boilerplate pattern is valid"))
    .collect()
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Normalizes whitespace and drops lines matching known boilerplate.
pub fn clean_body(raw: &str) -> String {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_boilerplate(line))
        .collect();

    let joined = lines.join(" ");
    WHITESPACE.replace_all(&joined, " ").trim().to_string()
}

fn is_boilerplate(line: &str) -> bool {
    BOILERPLATE_PATTERNS.iter().any(|re| re.is_match(line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_share_and_copyright_lines() {
        let raw = "Real content here.\nShare this article on social media\n© 2024 Example Corp. All rights reserved.\nMore real content.";
        let cleaned = clean_body(raw);
        assert!(cleaned.contains("Real content here."));
        assert!(cleaned.contains("More real content."));
        assert!(!cleaned.to_lowercase().contains("share this"));
        assert!(!cleaned.contains("©"));
    }

    #[test]
    fn collapses_whitespace() {
        let raw = "Line one.\n\n\n   Line two.  ";
        assert_eq!(clean_body(raw), "Line one. Line two.");
    }
}
