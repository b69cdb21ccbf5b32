use std::collections::HashSet;

use crate::entity::ExtractedEntities;

use super::similarity::{content_tokens, jaccard};

/// Structural fingerprint of a story: title 3-grams, named entities, and
/// salient title tokens. Used for `story_signature_overlap`, one of §4.4
/// Step 4's four orthogonal gates.
pub fn story_signature(title: &str, entities: &ExtractedEntities) -> HashSet<String> {
    let mut signature: HashSet<String> = HashSet::new();

    let title_tokens: Vec<String> = content_tokens(title).into_iter().collect();
    signature.extend(title_tokens.iter().cloned());

    let lowered = title.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    for window in words.windows(3) {
        signature.insert(window.join("_"));
    }

    for entity in &entities.entities {
        signature.insert(entity.normalized_name.clone());
    }

    signature
}

/// Overlap measured against the smaller signature, per §4.4 Step 4.
pub fn signature_overlap(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let smaller = a.len().min(b.len()) as f32;
    if smaller == 0.0 {
        0.0
    } else {
        intersection / smaller
    }
}

#[allow(dead_code)]
pub fn jaccard_signature(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    jaccard(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityType};

    #[test]
    fn shared_entities_increase_overlap() {
        let entities_a = ExtractedEntities {
            entities: vec![Entity::new("Michigan", "michigan", EntityType::Location)],
        };
        let entities_b = ExtractedEntities {
            entities: vec![Entity::new("Michigan", "michigan", EntityType::Location)],
        };
        let sig_a = story_signature("Shooting reported in Michigan town", &entities_a);
        let sig_b = story_signature("Gunfire incident hits Michigan neighborhood", &entities_b);
        assert!(signature_overlap(&sig_a, &sig_b) > 0.0);
    }
}
