use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleType {
    Breaking,
    Policy,
}

static BREAKING_VOCAB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(shooting|killed|dead|injured|crash|explosion|fire|attack|arrested|hostage|evacuat\w*|earthquake|flood|collapse|rescue|emergency)\b").unwrap()
});

static POLICY_VOCAB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(policy|regulation|legislation|bill|lawmakers?|parliament|congress|analysis|report found|study shows|committee|proposal|reform|framework|guidance|consultation)\b").unwrap()
});

/// Classifies an article as `breaking` or `policy` using lexical
/// heuristics, per §4.4 Step 2. This choice selects the weight vector and
/// threshold used in Step 3.
pub fn classify(combined_text: &str) -> ArticleType {
    let breaking_hits = BREAKING_VOCAB.find_iter(combined_text).count();
    let policy_hits = POLICY_VOCAB.find_iter(combined_text).count();

    if policy_hits > breaking_hits {
        ArticleType::Policy
    } else {
        ArticleType::Breaking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_shooting_report_as_breaking() {
        let text = "A shooting left three people injured and one dead in downtown Detroit.";
        assert_eq!(classify(text), ArticleType::Breaking);
    }

    #[test]
    fn classifies_legislative_coverage_as_policy() {
        let text = "Lawmakers debated the new data privacy regulation in a committee hearing.";
        assert_eq!(classify(text), ArticleType::Policy);
    }
}
