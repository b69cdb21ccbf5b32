mod clean;
mod fetch;
mod parse;
mod quality;
mod render;

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{ExtractionMethod, ExtractionResult};
use crate::TARGET_EXTRACTOR;

pub use fetch::{HtmlFetcher, ReqwestFetcher};
pub use render::{ChromiumRenderer, Renderer};

const SUMMARY_FALLBACK_BODY_MIN: usize = 200;
const SUMMARY_FALLBACK_DESCRIPTION_MIN: usize = 140;

/// Turns a URL into clean article text, per §4.2. Owns the two external
/// collaborators (`HtmlFetcher`, optional `Renderer`) behind trait objects
/// so tests can swap in fixed in-memory fakes.
pub struct Extractor {
    fetcher: Arc<dyn HtmlFetcher>,
    renderer: Option<Arc<dyn Renderer>>,
    renderer_enabled: bool,
}

impl Extractor {
    pub fn new(
        fetcher: Arc<dyn HtmlFetcher>,
        renderer: Option<Arc<dyn Renderer>>,
        renderer_enabled: bool,
    ) -> Self {
        Extractor {
            fetcher,
            renderer,
            renderer_enabled,
        }
    }

    pub async fn extract(&self, url: &str) -> ExtractionResult {
        let html = match self.fetcher.fetch(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(target: TARGET_EXTRACTOR, url, error = %e, "fetch failed");
                return ExtractionResult::Failure {
                    error: e.to_string(),
                };
            }
        };

        let (parsed, method) = resolve_body(parse::parse(&html, url));

        if quality::passes_quality_gate(&parsed) {
            return success(url, parsed, method);
        }

        if self.renderer_enabled && render::is_js_heavy(url, &html) {
            if let Some(renderer) = &self.renderer {
                info!(target: TARGET_EXTRACTOR, url, "escalating to rendered path");
                match renderer.render(url).await {
                    Ok(rendered_html) => {
                        let (rendered_parsed, _) = resolve_body(parse::parse(&rendered_html, url));
                        if quality::passes_quality_gate(&rendered_parsed) {
                            return success(url, rendered_parsed, ExtractionMethod::Rendered);
                        }
                    }
                    Err(e) => {
                        warn!(target: TARGET_EXTRACTOR, url, error = %e, "render unavailable");
                    }
                }
            }
        }

        ExtractionResult::Failure {
            error: "extraction failed quality gate".to_string(),
        }
    }
}

fn resolve_body(parsed: parse::Parsed) -> (parse::Parsed, ExtractionMethod) {
    let description_len = parsed.description.as_deref().map(str::len).unwrap_or(0);
    if parsed.body.len() < SUMMARY_FALLBACK_BODY_MIN && description_len >= SUMMARY_FALLBACK_DESCRIPTION_MIN {
        let body = parsed.description.clone().unwrap_or_default();
        return (
            parse::Parsed {
                title: parsed.title,
                description: parsed.description,
                body,
            },
            ExtractionMethod::SummaryFallback,
        );
    }
    (parsed, ExtractionMethod::Fast)
}

fn success(url: &str, parsed: parse::Parsed, method: ExtractionMethod) -> ExtractionResult {
    let source_domain = url::Url::parse(url)
        .ok()
        .and_then(|u| u.domain().map(str::to_string))
        .unwrap_or_default();

    ExtractionResult::Success {
        title: parsed.title,
        body: parsed.body,
        source_domain,
        method,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::error::PipelineError;

    struct FixedFetcher(String);

    #[async_trait]
    impl HtmlFetcher for FixedFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, PipelineError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn extracts_article_body_from_article_tag() {
        let html = format!(
            "<html><head><title>{}</title></head><body><article>{}</article></body></html>",
            "A Perfectly Reasonable Headline",
            "Officials said the storm caused significant damage across Michigan in 2024. \
             Jane Anderson, a spokesperson for the state emergency agency, confirmed assessments \
             are ongoing. The governor announced additional relief funding this week for affected \
             counties throughout the region."
        );
        let extractor = Extractor::new(Arc::new(FixedFetcher(html)), None, false);
        match extractor.extract("https://example.com/a").await {
            ExtractionResult::Success { title, body, source_domain, method } => {
                assert_eq!(title, "A Perfectly Reasonable Headline");
                assert!(body.contains("Michigan"));
                assert_eq!(source_domain, "example.com");
                assert_eq!(method, ExtractionMethod::Fast);
            }
            ExtractionResult::Failure { error } => panic!("expected success, got {error}"),
        }
    }

    #[tokio::test]
    async fn falls_back_to_description_when_body_too_short() {
        let description = "a".repeat(150);
        let html = format!(
            r#"<html><head><title>Short Body Headline Here</title><meta name="description" content="{description}"></head><body><article>short</article></body></html>"#
        );
        let extractor = Extractor::new(Arc::new(FixedFetcher(html)), None, false);
        match extractor.extract("https://example.com/b").await {
            ExtractionResult::Success { method, .. } => {
                assert_eq!(method, ExtractionMethod::SummaryFallback);
            }
            ExtractionResult::Failure { error } => panic!("expected success, got {error}"),
        }
    }

    #[tokio::test]
    async fn fails_on_low_quality_content_with_no_renderer() {
        let html = "<html><head><title>x</title></head><body><article>too short</article></body></html>";
        let extractor = Extractor::new(Arc::new(FixedFetcher(html.to_string())), None, false);
        match extractor.extract("https://example.com/c").await {
            ExtractionResult::Success { .. } => panic!("expected failure"),
            ExtractionResult::Failure { .. } => {}
        }
    }
}
