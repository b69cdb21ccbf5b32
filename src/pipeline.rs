use std::sync::Arc;

use crate::clusterer::{Clusterer, NullEmbedder, SemanticEmbedder};
use crate::config::Config;
use crate::db::{Article, Cluster, ClusterWithArticles, Database};
use crate::extractor::{Extractor, HtmlFetcher, ReqwestFetcher};
use crate::normalizer::{LLMParams, Normalizer};
use crate::processor::Processor;

/// Wires the Store, Extractor, Normalizer, Clusterer and Processor into one
/// object and exposes the crate's public surface. Replaces the teacher's
/// pattern of reaching for global mutable state with an explicit handle
/// callers pass around.
pub struct Pipeline {
    db: Arc<Database>,
    processor: Processor,
}

impl Pipeline {
    pub async fn new(config: Config) -> Result<Self, sqlx::Error> {
        let db = Arc::new(Database::new(&config.database_path).await?);
        Ok(Self::with_database(config, db))
    }

    pub fn with_database(config: Config, db: Arc<Database>) -> Self {
        let fetcher: Arc<dyn HtmlFetcher> = Arc::new(ReqwestFetcher::new(config.extraction_timeout_seconds));
        let renderer = if config.renderer_enabled {
            Some(Arc::new(crate::extractor::ChromiumRenderer) as Arc<dyn crate::extractor::Renderer>)
        } else {
            None
        };
        let extractor = Arc::new(Extractor::new(fetcher, renderer, config.renderer_enabled));

        let llm = match (&config.llm_endpoint, &config.llm_model) {
            (Some(endpoint), Some(model)) => Some(LLMParams::from_config(endpoint, model)),
            _ => None,
        };
        let normalizer = Arc::new(Normalizer::new(llm));

        let embedder: Arc<dyn SemanticEmbedder> = Arc::new(NullEmbedder);
        Self::with_collaborators(config, db, extractor, normalizer, embedder)
    }

    /// Assembles a pipeline from explicit collaborators rather than the
    /// default `reqwest`/`chromiumoxide`/`NullEmbedder` stack. Lets tests
    /// substitute fixed in-memory fakes for the `HtmlFetcher`/`Renderer`
    /// without ever making a real network call.
    pub fn with_collaborators(
        config: Config,
        db: Arc<Database>,
        extractor: Arc<Extractor>,
        normalizer: Arc<Normalizer>,
        embedder: Arc<dyn SemanticEmbedder>,
    ) -> Self {
        let clusterer = Arc::new(Clusterer::new(
            db.clone(),
            embedder,
            config.candidate_pool_size,
            config.similarity_threshold,
            config.semantic_weight,
        ));

        let processor = Processor::new(db.clone(), extractor, normalizer, clusterer, config);

        Pipeline { db, processor }
    }

    /// Submits a URL for ingestion, per §2's submission interface. Idempotent
    /// on `url`.
    pub async fn submit(&self, url: &str, original_title: Option<&str>) -> Result<i64, sqlx::Error> {
        let (article_id, is_new) = self.db.add_article(url, original_title).await?;
        if is_new {
            self.db.enqueue(article_id, 0).await?;
        }
        Ok(article_id)
    }

    pub async fn get_article(&self, article_id: i64) -> Result<Option<Article>, sqlx::Error> {
        self.db.get_article(article_id).await
    }

    pub async fn get_cluster(&self, cluster_id: i64) -> Result<Option<ClusterWithArticles>, sqlx::Error> {
        let cluster = match self.db.get_cluster(cluster_id).await? {
            Some(c) => c,
            None => return Ok(None),
        };
        let articles = self.db.get_cluster_articles(cluster_id).await?;
        Ok(Some(ClusterWithArticles { cluster, articles }))
    }

    pub async fn list_clusters(&self, limit: u32) -> Result<Vec<Cluster>, sqlx::Error> {
        self.db.get_clusters(limit).await
    }

    pub async fn list_singletons(&self, limit: u32, window_hours: Option<i64>) -> Result<Vec<Article>, sqlx::Error> {
        self.db.get_singleton_articles(limit, window_hours).await
    }

    pub fn database(&self) -> Arc<Database> {
        self.db.clone()
    }

    /// Runs the processor loop until the configured `max_articles_per_run`
    /// bound is reached or the queue is drained, whichever comes first.
    pub async fn run(&self) -> Result<(), crate::error::PipelineError> {
        self.processor.run().await
    }

    /// Runs a single article through Extractor → Normalizer → Store →
    /// Clusterer without the surrounding queue-claim loop. Used by
    /// integration tests to drive one article deterministically.
    pub async fn process_one(&self, article_id: i64) -> Result<(), crate::error::PipelineError> {
        self.processor.process_one(article_id).await
    }

    pub async fn sweep_singletons(&self) -> Result<(), crate::error::PipelineError> {
        self.processor.sweep_singletons().await
    }
}
