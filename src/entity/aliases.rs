use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Seed geopolitical synonym table, mirroring the shape of the teacher's
/// `entity_aliases` table but trimmed to canonicalization only — no
/// review workflow, no confidence scoring, no admin approval states,
/// since nothing in this pipeline writes new aliases at runtime.
static GPE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("uk", "united kingdom"),
        ("britain", "united kingdom"),
        ("great britain", "united kingdom"),
        ("england", "united kingdom"),
        ("us", "united states"),
        ("usa", "united states"),
        ("u.s.", "united states"),
        ("u.s.a.", "united states"),
        ("america", "united states"),
        ("uae", "united arab emirates"),
        ("drc", "democratic republic of the congo"),
        ("nyc", "new york city"),
        ("new york", "new york city"),
        ("dc", "washington dc"),
        ("washington", "washington dc"),
        ("la", "los angeles"),
        ("russia", "russian federation"),
        ("south korea", "republic of korea"),
        ("north korea", "democratic people's republic of korea"),
    ])
});

/// Resolves a surface-form geopolitical (or general) entity name to its
/// canonical form. Unknown names pass through unchanged, lowercased.
pub fn canonicalize(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    GPE_ALIASES.get(lower.as_str()).map(|s| s.to_string()).unwrap_or(lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_known_synonyms() {
        assert_eq!(canonicalize("UK"), "united kingdom");
        assert_eq!(canonicalize("Britain"), "united kingdom");
        assert_eq!(canonicalize("united kingdom"), "united kingdom");
    }

    #[test]
    fn passes_through_unknown_names() {
        assert_eq!(canonicalize("Paris"), "paris");
    }
}
