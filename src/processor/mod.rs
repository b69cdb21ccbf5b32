use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clusterer::Clusterer;
use crate::config::Config;
use crate::db::{ArticleStatus, ArticleUpdate, Database};
use crate::error::{ClusterDecision, ExtractionResult, PipelineError};
use crate::extractor::Extractor;
use crate::normalizer::Normalizer;
use crate::TARGET_PROCESSOR;

/// The orchestrator loop (§6): claims queue items, runs each through
/// Extractor → Normalizer → Store → Clusterer, and completes the queue
/// entry. Concurrency is bounded by a semaphore rather than a fixed worker
/// pool, matching the teacher's shape for bursty, I/O-bound fan-out.
pub struct Processor {
    db: Arc<Database>,
    extractor: Arc<Extractor>,
    normalizer: Arc<Normalizer>,
    clusterer: Arc<Clusterer>,
    config: Config,
}

impl Processor {
    pub fn new(
        db: Arc<Database>,
        extractor: Arc<Extractor>,
        normalizer: Arc<Normalizer>,
        clusterer: Arc<Clusterer>,
        config: Config,
    ) -> Self {
        Processor {
            db,
            extractor,
            normalizer,
            clusterer,
            config,
        }
    }

    /// Runs until the queue is drained or `max_articles_per_run` items have
    /// been processed, whichever comes first. Resets crash-stuck `processing`
    /// rows before starting, per §7.
    pub async fn run(&self) -> Result<(), PipelineError> {
        let stuck_threshold = chrono::Utc::now()
            - chrono::Duration::seconds(self.config.watchdog_interval_seconds);
        let reset = self.db.reset_stuck_queue_items(stuck_threshold).await?;
        if reset > 0 {
            warn!(target: TARGET_PROCESSOR, reset, "recovered stuck queue items on startup");
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut in_flight = Vec::new();
        let mut claimed = 0u32;
        let mut last_sweep = chrono::Utc::now();

        loop {
            if claimed >= self.config.max_articles_per_run {
                info!(target: TARGET_PROCESSOR, claimed, "reached max_articles_per_run, stopping");
                break;
            }

            let item = match self.db.claim_next_queue_item().await? {
                Some(item) => item,
                None => {
                    info!(target: TARGET_PROCESSOR, "queue drained");
                    break;
                }
            };
            claimed += 1;

            let permit = semaphore.clone().acquire_owned().await.expect("semaphore closed");
            let db = self.db.clone();
            let extractor = self.extractor.clone();
            let normalizer = self.normalizer.clone();
            let clusterer = self.clusterer.clone();
            let delay = self.config.per_article_delay_seconds;

            in_flight.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = process_article(&db, &extractor, &normalizer, &clusterer, item.article_id).await;
                match &outcome {
                    Ok(()) => {
                        let _ = db.complete_queue_item(item.id, true, None).await;
                    }
                    Err(e) => {
                        warn!(target: TARGET_PROCESSOR, article_id = item.article_id, error = %e, "article processing failed");
                        let _ = db.complete_queue_item(item.id, false, Some(&e.to_string())).await;
                    }
                }
                tokio::time::sleep(Duration::from_secs_f64(delay)).await;
            }));

            let since_sweep = chrono::Utc::now() - last_sweep;
            if since_sweep.num_seconds() >= self.config.watchdog_interval_seconds {
                self.sweep_singletons().await?;
                last_sweep = chrono::Utc::now();
            }
        }

        for handle in in_flight {
            if let Err(e) = handle.await {
                error!(target: TARGET_PROCESSOR, error = %e, "processing task panicked");
            }
        }

        Ok(())
    }

    /// Re-runs clustering for articles that never joined a cluster, within
    /// the configured time window, per §4.4.2's late-arrival sweep.
    pub async fn sweep_singletons(&self) -> Result<(), PipelineError> {
        let singletons = self
            .db
            .get_singleton_articles(
                self.config.singleton_sweep_limit,
                Some(self.config.singleton_sweep_window_hours),
            )
            .await?;

        if singletons.is_empty() {
            return Ok(());
        }
        info!(target: TARGET_PROCESSOR, count = singletons.len(), "sweeping singleton articles");

        for article in singletons {
            let combined = combined_text(&article);
            if combined.trim().is_empty() {
                continue;
            }
            match self.clusterer.cluster(article.id, &combined).await {
                Ok(ClusterDecision::Joined { cluster_id, .. }) => {
                    info!(target: TARGET_PROCESSOR, article_id = article.id, cluster_id, "singleton sweep joined a cluster");
                }
                Ok(ClusterDecision::Founded { cluster_id, .. }) => {
                    info!(target: TARGET_PROCESSOR, article_id = article.id, cluster_id, "singleton sweep founded a cluster");
                }
                Ok(ClusterDecision::Singleton) => {}
                Err(e) => {
                    error!(target: TARGET_PROCESSOR, article_id = article.id, error = %e, "singleton sweep clustering failed");
                }
            }
        }

        Ok(())
    }

    /// Runs a single article through Extractor → Normalizer → Store →
    /// Clusterer, without the queue-claim/complete bookkeeping around it.
    /// Exposed for integration tests that want to drive one article
    /// deterministically instead of the free-running loop (§8).
    pub async fn process_one(&self, article_id: i64) -> Result<(), PipelineError> {
        process_article(&self.db, &self.extractor, &self.normalizer, &self.clusterer, article_id).await
    }
}

async fn process_article(
    db: &Database,
    extractor: &Extractor,
    normalizer: &Normalizer,
    clusterer: &Clusterer,
    article_id: i64,
) -> Result<(), PipelineError> {
    let article = db
        .get_article(article_id)
        .await?
        .ok_or_else(|| PipelineError::PermanentFetch("article not found".to_string()))?;

    let extraction = extractor.extract(&article.url).await;
    let (body, source_domain) = match extraction {
        ExtractionResult::Success { body, source_domain, .. } => (body, source_domain),
        ExtractionResult::Failure { error } => {
            db.update_article(
                article_id,
                &ArticleUpdate {
                    status: Some(ArticleStatus::Failed),
                    ..Default::default()
                },
            )
            .await?;
            return Err(PipelineError::LowQuality(error));
        }
    };

    let title = normalizer.generate_title(&body, article.original_title.as_deref()).await;
    let excerpt = normalizer.generate_excerpt(&body, article.original_title.as_deref()).await;

    db.update_article(
        article_id,
        &ArticleUpdate {
            status: Some(ArticleStatus::Completed),
            generated_title: Some(title.clone()),
            excerpt: Some(excerpt.clone()),
            content: Some(body.clone()),
            source_domain: Some(source_domain),
            processed_at: Some(chrono::Utc::now().to_rfc3339()),
        },
    )
    .await?;

    let combined = combined_text_preview(&title, &excerpt, &body);
    match clusterer.cluster(article_id, &combined).await {
        Ok(ClusterDecision::Joined { cluster_id, similarity }) => {
            info!(target: TARGET_PROCESSOR, article_id, cluster_id, similarity, "joined existing cluster");
        }
        Ok(ClusterDecision::Founded { cluster_id, peers }) => {
            info!(target: TARGET_PROCESSOR, article_id, cluster_id, peers = peers.len(), "founded new cluster");
        }
        Ok(ClusterDecision::Singleton) => {
            info!(target: TARGET_PROCESSOR, article_id, "remains a singleton");
        }
        Err(e) => return Err(PipelineError::Store(e)),
    }

    Ok(())
}

/// Matches `clusterer::combined_text_of`'s 1500-char content preview so a
/// freshly-processed article and a clustering candidate built from the same
/// row score identically (§4.4's `content_preview[:1500]` contract).
const CONTENT_PREVIEW_CHARS: usize = 1500;

fn combined_text_preview(title: &str, excerpt: &str, content: &str) -> String {
    let preview: String = content.chars().take(CONTENT_PREVIEW_CHARS).collect();
    format!("{title} {excerpt} {preview}")
}

fn combined_text(article: &crate::db::Article) -> String {
    let title = article.generated_title.as_deref().unwrap_or("");
    let excerpt = article.excerpt.as_deref().unwrap_or("");
    let content = article.content.as_deref().unwrap_or("");
    combined_text_preview(title, excerpt, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_text_joins_available_fields() {
        let article = crate::db::Article {
            id: 1,
            url: "https://example.com".to_string(),
            original_title: None,
            generated_title: Some("Title".to_string()),
            excerpt: Some("Excerpt".to_string()),
            content: Some("Body".to_string()),
            source_domain: None,
            status: "completed".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            processed_at: None,
        };
        assert_eq!(combined_text(&article), "Title Excerpt Body");
    }
}
