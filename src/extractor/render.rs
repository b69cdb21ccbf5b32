use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use tracing::{error, warn};
use url::Url;

use crate::error::PipelineError;
use crate::TARGET_EXTRACTOR;

/// Known dynamic sites whose fast-path HTML is near-empty without
/// client-side rendering, per §4.2 Step 3's JS-heavy classification.
static KNOWN_DYNAMIC_DOMAINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["twitter.com", "x.com", "bloomberg.com", "wsj.com"]
        .into_iter()
        .collect()
});

const FRAMEWORK_MARKERS: &[&str] = &[
    "id=\"root\"",
    "id=\"__next\"",
    "data-reactroot",
    "ng-version",
    "__NUXT__",
];

pub fn is_js_heavy(url: &str, raw_html: &str) -> bool {
    let domain_hit = Url::parse(url)
        .ok()
        .and_then(|u| u.domain().map(str::to_string))
        .map(|domain| {
            KNOWN_DYNAMIC_DOMAINS
                .iter()
                .any(|known| domain == *known || domain.ends_with(&format!(".{known}")))
        })
        .unwrap_or(false);

    domain_hit || FRAMEWORK_MARKERS.iter().any(|marker| raw_html.contains(marker))
}

/// Fully-rendered-DOM retrieval, the second optional external collaborator.
/// Absence of a reachable browser degrades to "rendered path unavailable"
/// rather than a hard pipeline error.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, PipelineError>;
}

pub struct ChromiumRenderer;

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str) -> Result<String, PipelineError> {
        let (browser, mut handler) = Browser::launch(BrowserConfig::builder().build().map_err(|e| {
            PipelineError::TransientFetch(format!("failed to configure renderer: {e}"))
        })?)
        .await
        .map_err(|e| PipelineError::TransientFetch(format!("failed to launch renderer: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    warn!(target: TARGET_EXTRACTOR, "renderer handler event error");
                }
            }
        });

        let result = async {
            let page = browser
                .new_page(url)
                .await
                .map_err(|e| PipelineError::TransientFetch(e.to_string()))?;
            page.wait_for_navigation()
                .await
                .map_err(|e| PipelineError::TransientFetch(e.to_string()))?;
            page.content()
                .await
                .map_err(|e| PipelineError::TransientFetch(e.to_string()))
        }
        .await;

        handler_task.abort();
        if let Err(e) = &result {
            error!(target: TARGET_EXTRACTOR, url, error = %e, "render failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_dynamic_domain() {
        assert!(is_js_heavy("https://x.com/some/status", "<html></html>"));
    }

    #[test]
    fn classifies_framework_markers() {
        assert!(is_js_heavy(
            "https://news.example.com/a",
            r#"<div id="__next"></div>"#
        ));
    }

    #[test]
    fn plain_html_is_not_js_heavy() {
        assert!(!is_js_heavy(
            "https://news.example.com/a",
            "<html><body><article>text</article></body></html>"
        ));
    }
}
