use super::aliases::canonicalize;
use super::types::{Entity, EntityType, ExtractedEntities, ImportanceLevel};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Sequences of 1-3 capitalized words, e.g. "Michigan", "United Nations",
/// "New York City". This is the lexical proper-noun detector the clusterer
/// uses for both the generic `entity_overlap` gate and the story signature.
static CAPITALIZED_SEQUENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z'’-]+(?:\s+[A-Z][a-z'’-]+){0,2})\b").unwrap());

/// A small curated gazetteer of place names. Not exhaustive — the clusterer
/// only needs enough recall to compute a location-overlap signal, not a
/// full geocoder.
static LOCATION_GAZETTEER: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "united kingdom", "united states", "united arab emirates", "russian federation",
        "republic of korea", "democratic people's republic of korea",
        "democratic republic of the congo", "washington dc", "new york city", "los angeles",
        "china", "france", "germany", "italy", "spain", "japan", "india", "brazil", "canada",
        "mexico", "australia", "egypt", "israel", "palestine", "gaza", "ukraine", "poland",
        "michigan", "california", "texas", "florida", "ohio", "georgia", "virginia",
        "chicago", "detroit", "boston", "houston", "seattle", "atlanta", "miami", "london",
        "paris", "berlin", "moscow", "beijing", "tokyo", "delhi", "cairo", "kyiv", "tehran",
        "baghdad", "kabul", "syria", "iran", "iraq", "afghanistan", "pakistan", "taiwan",
        "sudan", "yemen", "lebanon", "turkey", "nigeria", "kenya", "somalia",
    ])
});

/// Event-category keywords. Membership, not frequency, is what matters for
/// the Jaccard overlap the clusterer computes.
static EVENT_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        "shooting", "shootings", "ceasefire", "election", "elections", "attack", "attacks",
        "earthquake", "flood", "flooding", "crash", "protest", "protests", "strike", "strikes",
        "bombing", "hurricane", "wildfire", "outbreak", "indictment", "resignation",
        "referendum", "summit", "treaty", "sanctions", "merger", "acquisition", "recall",
        "lawsuit", "verdict", "arrest", "arrests", "killed", "wounded", "hostage", "hostages",
        "evacuation", "explosion", "raid", "coup", "assassination", "kidnapping",
    ])
});

/// Extracts proper-noun, location and event entities from free text using
/// lexical heuristics only — no model call. Gazetteer hits and aliased
/// surface forms are canonicalized so "UK" and "Britain" collapse together.
pub fn extract_entities(text: &str) -> ExtractedEntities {
    let mut entities = Vec::new();
    let mut seen_locations: HashSet<String> = HashSet::new();
    let mut seen_generic: HashSet<String> = HashSet::new();

    for cap in CAPITALIZED_SEQUENCE.captures_iter(text) {
        let name = cap[1].to_string();
        let canonical = canonicalize(&name);
        if LOCATION_GAZETTEER.contains(canonical.as_str()) {
            if seen_locations.insert(canonical.clone()) {
                entities.push(
                    Entity::new(&name, &canonical, EntityType::Location)
                        .with_importance(ImportanceLevel::Secondary),
                );
            }
        } else if canonical.split_whitespace().count() >= 1 && seen_generic.insert(canonical.clone())
        {
            entities.push(
                Entity::new(&name, &canonical, EntityType::Organization)
                    .with_importance(ImportanceLevel::Mentioned),
            );
        }
    }

    let lower = text.to_lowercase();
    let mut seen_events: HashSet<String> = HashSet::new();
    for word in lower.split(|c: char| !c.is_alphanumeric()) {
        if EVENT_KEYWORDS.contains(word) && seen_events.insert(word.to_string()) {
            entities.push(
                Entity::new(word, word, EntityType::Event)
                    .with_importance(ImportanceLevel::Secondary),
            );
        }
    }

    ExtractedEntities { entities }
}

/// Convenience used by the classifier and gates: the set of canonicalized
/// location names found in `text`, ignoring everything else.
pub fn location_set(text: &str) -> HashSet<String> {
    extract_entities(text).normalized_names_by_type(EntityType::Location)
}

/// The set of event-category keywords found in `text`.
pub fn event_set(text: &str) -> HashSet<String> {
    extract_entities(text).normalized_names_by_type(EntityType::Event)
}

/// The set of all proper-noun-ish canonical names found in `text`
/// (locations and generic capitalized sequences), used by the
/// `entity_overlap` gate.
pub fn named_entity_set(text: &str) -> HashSet<String> {
    let extracted = extract_entities(text);
    extracted
        .entities
        .iter()
        .map(|e| e.normalized_name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_location_and_event_keywords() {
        let text = "A shooting was reported in Michigan on Tuesday, officials said.";
        let locs = location_set(text);
        assert!(locs.contains("michigan"));
        let events = event_set(text);
        assert!(events.contains("shooting"));
    }

    #[test]
    fn canonicalizes_gpe_synonyms_across_texts() {
        let a = location_set("Officials in the UK announced new rules.");
        let b = location_set("Britain's government responded today.");
        assert_eq!(a, b);
    }
}
