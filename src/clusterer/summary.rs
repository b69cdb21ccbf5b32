use std::collections::HashMap;

use unicode_segmentation::UnicodeSegmentation;

use crate::entity::{extract_entities, EntityType};

use super::similarity::{content_tokens, jaccard};

const TITLE_MAX_CHARS: usize = 90;
const SUMMARY_WORD_BUDGET: usize = 140;

/// Deterministic cluster title, per §4.4.1. Picks a central headline via
/// token-Jaccard centrality across member headlines; if none is central
/// enough, composes `<Location> — <Topic>`; otherwise falls back to the two
/// most frequent capitalized tokens.
pub fn generate_title(member_titles: &[&str], member_texts: &[&str]) -> String {
    if let Some(central) = most_central_title(member_titles) {
        return title_case(&truncate_chars(&central, TITLE_MAX_CHARS));
    }

    let combined_text = member_texts.join(" ");
    let entities = extract_entities(&combined_text);
    let location = entities
        .by_type(EntityType::Location)
        .next()
        .map(|e| e.name.clone());
    let topic = top_keyword_category(&combined_text);

    if let (Some(location), Some(topic)) = (location, topic) {
        return title_case(&truncate_chars(&format!("{location} — {topic}"), TITLE_MAX_CHARS));
    }

    let fallback = two_most_frequent_capitalized_tokens(&combined_text);
    if !fallback.is_empty() {
        return title_case(&truncate_chars(&fallback, TITLE_MAX_CHARS));
    }

    "Developing Story".to_string()
}

fn most_central_title(titles: &[&str]) -> Option<String> {
    if titles.is_empty() {
        return None;
    }
    if titles.len() == 1 {
        return Some(titles[0].to_string());
    }

    let token_sets: Vec<_> = titles.iter().map(|t| content_tokens(t)).collect();
    let mut best_index = 0;
    let mut best_score = -1.0f32;

    for (i, set_i) in token_sets.iter().enumerate() {
        let score: f32 = token_sets
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, set_j)| jaccard(set_i, set_j))
            .sum();
        if score > best_score {
            best_score = score;
            best_index = i;
        }
    }

    if best_score > 0.0 {
        Some(titles[best_index].to_string())
    } else {
        None
    }
}

const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("Ceasefire", &["ceasefire", "truce"]),
    ("Attack", &["attack", "shooting", "bombing"]),
    ("Election", &["election", "vote", "ballot"]),
    ("Disaster", &["earthquake", "flood", "hurricane", "wildfire"]),
    ("Policy", &["regulation", "legislation", "bill", "policy"]),
];

fn top_keyword_category(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    TOPIC_KEYWORDS
        .iter()
        .map(|(label, keywords)| {
            let count = keywords.iter().filter(|k| lower.contains(*k)).count();
            (label, count)
        })
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(label, _)| label.to_string())
}

fn two_most_frequent_capitalized_tokens(text: &str) -> String {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in text.split_whitespace() {
        let trimmed: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        if trimmed.chars().next().is_some_and(|c| c.is_uppercase()) && trimmed.len() > 2 {
            *counts.entry(trimmed).or_insert(0) += 1;
        }
    }
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(2)
        .map(|(word, _)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            if word.chars().all(|c| c.is_uppercase()) && word.len() > 1 {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// First informative sentence from each of up to three member texts,
/// deduplicated and joined until the word budget is reached.
pub fn generate_summary(member_texts: &[&str]) -> String {
    let mut picked: Vec<String> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut word_count = 0;

    for text in member_texts.iter().take(3) {
        if let Some(sentence) = first_informative_sentence(text) {
            let key = sentence.to_lowercase();
            if seen.insert(key) {
                word_count += sentence.unicode_words().count();
                picked.push(sentence);
            }
        }
        if word_count >= SUMMARY_WORD_BUDGET {
            break;
        }
    }

    if picked.is_empty() {
        return "Details are still developing.".to_string();
    }

    let joined = picked.join(" ");
    let trimmed = joined.trim();
    if trimmed.ends_with('.') || trimmed.ends_with('!') || trimmed.ends_with('?') {
        trimmed.to_string()
    } else {
        format!("{trimmed}.")
    }
}

fn first_informative_sentence(text: &str) -> Option<String> {
    text.unicode_sentences()
        .map(str::trim)
        .find(|s| s.len() >= 30 && s.len() <= 240 && !looks_like_boilerplate(s))
        .map(str::to_string)
}

fn looks_like_boilerplate(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    lower.contains("subscribe") || lower.contains("follow us") || lower.contains("{") || lower.contains("```")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn central_title_wins_when_titles_overlap() {
        let titles = [
            "Storm Damages Coastal Towns in Michigan",
            "Severe Storm Hits Coastal Michigan",
            "Completely Unrelated Sports Headline",
        ];
        let texts = ["text one", "text two", "text three"];
        let title = generate_title(&titles, &texts);
        assert!(title.to_lowercase().contains("storm") || title.to_lowercase().contains("michigan"));
    }

    #[test]
    fn summary_ends_with_terminal_punctuation() {
        let texts = [
            "Officials said the storm caused significant flooding across the region on Tuesday.",
            "Residents described the damage as the worst they had seen in decades of living there.",
        ];
        let summary = generate_summary(&texts);
        assert!(summary.ends_with('.') || summary.ends_with('!') || summary.ends_with('?'));
    }
}
