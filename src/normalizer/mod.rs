mod clean;
mod fallback;
mod model;

pub use model::{LLMClient, LLMParams};

use tracing::{info, warn};

use crate::TARGET_NORMALIZER;

const TITLE_MIN: usize = 10;
const TITLE_MAX: usize = 100;
const EXCERPT_MIN_WORDS: usize = 50;
const EXCERPT_MAX_WORDS: usize = 200;

/// Produces a neutral title and excerpt regardless of source-site style.
/// Never raises past the Processor boundary: the deterministic fallback
/// always has an answer, per §4.3's contract.
pub struct Normalizer {
    llm: Option<LLMParams>,
}

impl Normalizer {
    pub fn new(llm: Option<LLMParams>) -> Self {
        Normalizer { llm }
    }

    pub async fn generate_title(&self, body: &str, original_title: Option<&str>) -> String {
        if let Some(params) = &self.llm {
            let prompt = title_prompt(body, original_title);
            if let Some(raw) = model::generate_llm_response(&prompt, params).await {
                let cleaned = clean::clean_model_output(&raw);
                if clean::is_valid_model_output(&cleaned, TITLE_MIN, TITLE_MAX) {
                    info!(target: TARGET_NORMALIZER, "using model-generated title");
                    return cleaned;
                }
                warn!(target: TARGET_NORMALIZER, "model title failed validation, using fallback");
            }
        }
        fallback::generate_title(body, original_title)
    }

    pub async fn generate_excerpt(&self, body: &str, original_title: Option<&str>) -> String {
        if let Some(params) = &self.llm {
            let prompt = excerpt_prompt(body, original_title);
            if let Some(raw) = model::generate_llm_response(&prompt, params).await {
                let cleaned = clean::clean_model_output(&raw);
                let word_count = cleaned.split_whitespace().count();
                if clean::is_valid_model_output(&cleaned, 1, 2000)
                    && (EXCERPT_MIN_WORDS..=EXCERPT_MAX_WORDS).contains(&word_count)
                {
                    info!(target: TARGET_NORMALIZER, "using model-generated excerpt");
                    return cleaned;
                }
                warn!(target: TARGET_NORMALIZER, "model excerpt failed validation, using fallback");
            }
        }
        fallback::generate_excerpt(body, original_title)
    }
}

fn title_prompt(body: &str, original_title: Option<&str>) -> String {
    let context = original_title.unwrap_or("");
    format!(
        "Write a single neutral, factual news headline between 10 and 100 characters for the \
         article below. Do not include commentary, markdown, or quotation marks. Respond with \
         only the headline.\n\nOriginal title: {context}\n\nArticle:\n{body}"
    )
}

fn excerpt_prompt(body: &str, original_title: Option<&str>) -> String {
    let context = original_title.unwrap_or("");
    format!(
        "Write a neutral, factual summary between 50 and 200 words for the article below. Do not \
         include commentary, markdown, or headers. Respond with only the summary.\n\nOriginal \
         title: {context}\n\nArticle:\n{body}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_when_no_llm_configured() {
        let normalizer = Normalizer::new(None);
        let body = "Officials confirmed the bridge collapse in Ohio on Monday after heavy rain.";
        let title = normalizer.generate_title(body, None).await;
        assert!(title.len() >= 10);
    }
}
