use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::TARGET_EXTRACTOR;

/// Raw-HTML retrieval, the first of the two external collaborators the
/// Extractor depends on. Kept as a trait so tests can swap in a fixed
/// in-memory fake instead of making a real network call.
#[async_trait]
pub trait HtmlFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, PipelineError>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
}

impl ReqwestFetcher {
    pub fn new(timeout_seconds: u64) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; newsclust/0.1; +https://example.invalid/bot)")
            .cookie_store(true)
            .gzip(true)
            .build()
            .expect("failed to build reqwest client");

        ReqwestFetcher {
            client,
            timeout: Duration::from_secs(timeout_seconds),
            max_retries: 2,
        }
    }
}

#[async_trait]
impl HtmlFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
        let mut backoff = 1u64;

        for attempt in 0..=self.max_retries {
            debug!(target: TARGET_EXTRACTOR, url, attempt, "fetching");
            let request = self.client.get(url).send();

            match timeout(self.timeout, request).await {
                Ok(Ok(response)) => {
                    let status = response.status();
                    if status.as_u16() >= 500 {
                        warn!(target: TARGET_EXTRACTOR, url, %status, "server error");
                        if attempt < self.max_retries {
                            sleep(Duration::from_secs(backoff)).await;
                            backoff *= 2;
                            continue;
                        }
                        return Err(PipelineError::TransientFetch(format!(
                            "{status} after {} retries",
                            self.max_retries
                        )));
                    }
                    if status.is_client_error() {
                        return Err(PipelineError::PermanentFetch(format!("{status}")));
                    }

                    let bytes = response
                        .bytes()
                        .await
                        .map_err(|e| PipelineError::TransientFetch(e.to_string()))?;
                    return Ok(decode_body(&bytes));
                }
                Ok(Err(e)) => {
                    if e.is_connect() || e.is_timeout() {
                        warn!(target: TARGET_EXTRACTOR, url, error = %e, "transient fetch error");
                        if attempt < self.max_retries {
                            sleep(Duration::from_secs(backoff)).await;
                            backoff *= 2;
                            continue;
                        }
                        return Err(PipelineError::TransientFetch(e.to_string()));
                    }
                    return Err(PipelineError::PermanentFetch(e.to_string()));
                }
                Err(_) => {
                    warn!(target: TARGET_EXTRACTOR, url, "fetch timed out");
                    if attempt < self.max_retries {
                        sleep(Duration::from_secs(backoff)).await;
                        backoff *= 2;
                        continue;
                    }
                    return Err(PipelineError::Timeout("extraction fetch"));
                }
            }
        }
        unreachable!()
    }
}

/// Declared-charset-then-UTF-8-fallback decoding, per §4.2's edge case.
fn decode_body(bytes: &[u8]) -> String {
    let (text, _encoding, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }

    // Sniff a meta charset declaration in the first chunk before falling
    // back to lossy UTF-8, since the HTTP header often omits it.
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(2048)]);
    if let Some(label) = sniff_charset(&head) {
        if let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) {
            let (text, _, _) = encoding.decode(bytes);
            return text.into_owned();
        }
    }
    text.into_owned()
}

fn sniff_charset(head: &str) -> Option<String> {
    let lower = head.to_lowercase();
    let marker = "charset=";
    let idx = lower.find(marker)?;
    let rest = &lower[idx + marker.len()..];
    let end = rest
        .find(|c: char| c == '"' || c == '\'' || c == ';' || c == '>' || c.is_whitespace())
        .unwrap_or(rest.len());
    let label = rest[..end].trim_matches(|c| c == '"' || c == '\'');
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_charset_from_meta_tag() {
        let head = r#"<html><head><meta charset="iso-8859-1"></head>"#;
        assert_eq!(sniff_charset(head), Some("iso-8859-1".to_string()));
    }

    #[test]
    fn sniffs_nothing_when_absent() {
        assert_eq!(sniff_charset("<html><head></head>"), None);
    }
}
