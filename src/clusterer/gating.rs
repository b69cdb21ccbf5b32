/// Inputs to the §4.4 Step 4 gate evaluation for one candidate.
pub struct GateInputs {
    pub title_similarity: f32,
    pub token_jaccard: f32,
    pub time_ok: bool,
    pub entity_overlap: bool,
    pub signature_overlap: f32,
    pub same_domain: bool,
    /// True when the only shared tokens between the two texts are pure
    /// geography terms, with no other lexical overlap.
    pub geography_only_overlap: bool,
}

const TITLE_SIMILARITY_THRESHOLD: f32 = 0.40;
const TOKEN_JACCARD_WITH_ENTITY: f32 = 0.15;
const TOKEN_JACCARD_WITHOUT_ENTITY: f32 = 0.10;
const SIGNATURE_OVERLAP_THRESHOLD: f32 = 0.08;
const GEOGRAPHY_ONLY_TITLE_FLOOR: f32 = 0.30;

const SAME_DOMAIN_TITLE_THRESHOLD: f32 = 0.30;
const SAME_DOMAIN_TOKEN_JACCARD_THRESHOLD: f32 = 0.08;

/// Evaluates the orthogonal gates a candidate must clear, independent of
/// whether the base similarity score meets its type-specific threshold
/// (that check happens one level up, in `mod.rs`).
pub fn passes_gates(inputs: &GateInputs) -> bool {
    if !inputs.time_ok {
        return false;
    }

    if inputs.same_domain {
        return inputs.title_similarity >= SAME_DOMAIN_TITLE_THRESHOLD
            && inputs.token_jaccard >= SAME_DOMAIN_TOKEN_JACCARD_THRESHOLD;
    }

    let token_jaccard_threshold = if inputs.entity_overlap {
        TOKEN_JACCARD_WITH_ENTITY
    } else {
        TOKEN_JACCARD_WITHOUT_ENTITY
    };

    let signals_passed = [
        inputs.title_similarity >= TITLE_SIMILARITY_THRESHOLD,
        inputs.token_jaccard >= token_jaccard_threshold,
        inputs.entity_overlap,
        inputs.signature_overlap >= SIGNATURE_OVERLAP_THRESHOLD,
    ]
    .into_iter()
    .filter(|pass| *pass)
    .count();

    if signals_passed < 1 {
        return false;
    }

    if inputs.geography_only_overlap && inputs.title_similarity < GEOGRAPHY_ONLY_TITLE_FLOOR {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_when_time_window_exceeded() {
        let inputs = GateInputs {
            title_similarity: 0.9,
            token_jaccard: 0.5,
            time_ok: false,
            entity_overlap: true,
            signature_overlap: 0.5,
            same_domain: false,
            geography_only_overlap: false,
        };
        assert!(!passes_gates(&inputs));
    }

    #[test]
    fn rejects_pure_geography_overlap_with_low_title_similarity() {
        let inputs = GateInputs {
            title_similarity: 0.10,
            token_jaccard: 0.20,
            time_ok: true,
            entity_overlap: false,
            signature_overlap: 0.0,
            same_domain: false,
            geography_only_overlap: true,
        };
        assert!(!passes_gates(&inputs));
    }

    #[test]
    fn same_domain_requires_stricter_combination() {
        let weak = GateInputs {
            title_similarity: 0.25,
            token_jaccard: 0.20,
            time_ok: true,
            entity_overlap: true,
            signature_overlap: 0.5,
            same_domain: true,
            geography_only_overlap: false,
        };
        assert!(!passes_gates(&weak));

        let strong = GateInputs {
            title_similarity: 0.35,
            token_jaccard: 0.10,
            time_ok: true,
            entity_overlap: false,
            signature_overlap: 0.0,
            same_domain: true,
            geography_only_overlap: false,
        };
        assert!(passes_gates(&strong));
    }

    #[test]
    fn accepts_with_single_passing_signal() {
        let inputs = GateInputs {
            title_similarity: 0.0,
            token_jaccard: 0.0,
            time_ok: true,
            entity_overlap: true,
            signature_overlap: 0.0,
            same_domain: false,
            geography_only_overlap: false,
        };
        assert!(passes_gates(&inputs));
    }
}
