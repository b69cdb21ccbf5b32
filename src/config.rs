use clap::Parser;
use std::env;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Process configuration. Assembled from the environment, then selectively
/// overridden by CLI flags on the `processor` binary — this is the
/// pipeline's own runtime configuration, not a user-facing feed surface.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub similarity_threshold: f32,
    pub per_article_delay_seconds: f64,
    pub max_articles_per_run: u32,
    pub singleton_sweep_window_hours: i64,
    pub singleton_sweep_limit: u32,
    pub candidate_pool_size: u32,
    pub extraction_timeout_seconds: u64,
    pub renderer_enabled: bool,
    pub max_concurrency: usize,
    pub queue_poll_interval_seconds: f64,
    pub watchdog_interval_seconds: i64,
    pub llm_endpoint: Option<String>,
    pub llm_model: Option<String>,
    pub semantic_weight: f32,
    pub log_dir: String,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: "./newsclust.db".to_string(),
            similarity_threshold: 0.22,
            per_article_delay_seconds: 1.0,
            max_articles_per_run: 100,
            singleton_sweep_window_hours: 72,
            singleton_sweep_limit: 300,
            candidate_pool_size: 150,
            extraction_timeout_seconds: 30,
            renderer_enabled: true,
            max_concurrency: 4,
            queue_poll_interval_seconds: 5.0,
            watchdog_interval_seconds: 900,
            llm_endpoint: None,
            llm_model: None,
            semantic_weight: 0.0,
            log_dir: "./logs".to_string(),
            log_filter: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Config::default();
        Config {
            database_path: env_string("DATABASE_PATH", &default.database_path),
            similarity_threshold: env_or("SIMILARITY_THRESHOLD", default.similarity_threshold),
            per_article_delay_seconds: env_or(
                "PER_ARTICLE_DELAY_SECONDS",
                default.per_article_delay_seconds,
            ),
            max_articles_per_run: env_or("MAX_ARTICLES_PER_RUN", default.max_articles_per_run),
            singleton_sweep_window_hours: env_or(
                "SINGLETON_SWEEP_WINDOW_HOURS",
                default.singleton_sweep_window_hours,
            ),
            singleton_sweep_limit: env_or(
                "SINGLETON_SWEEP_LIMIT",
                default.singleton_sweep_limit,
            ),
            candidate_pool_size: env_or("CANDIDATE_POOL_SIZE", default.candidate_pool_size),
            extraction_timeout_seconds: env_or(
                "EXTRACTION_TIMEOUT_SECONDS",
                default.extraction_timeout_seconds,
            ),
            renderer_enabled: env_or("RENDERER_ENABLED", default.renderer_enabled),
            max_concurrency: env_or("MAX_CONCURRENCY", default.max_concurrency),
            queue_poll_interval_seconds: env_or(
                "QUEUE_POLL_INTERVAL_SECONDS",
                default.queue_poll_interval_seconds,
            ),
            watchdog_interval_seconds: env_or(
                "WATCHDOG_INTERVAL_SECONDS",
                default.watchdog_interval_seconds,
            ),
            llm_endpoint: env::var("LLM_ENDPOINT").ok(),
            llm_model: env::var("LLM_MODEL").ok(),
            semantic_weight: env_or("SEMANTIC_WEIGHT", default.semantic_weight),
            log_dir: env_string("LOG_DIR", &default.log_dir),
            log_filter: env_string("RUST_LOG", &default.log_filter),
        }
    }

    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(v) = cli.database_path.clone() {
            self.database_path = v;
        }
        if let Some(v) = cli.similarity_threshold {
            self.similarity_threshold = v;
        }
        if let Some(v) = cli.max_concurrency {
            self.max_concurrency = v;
        }
        if let Some(v) = cli.max_articles_per_run {
            self.max_articles_per_run = v;
        }
        self
    }
}

/// CLI overlay for the `processor` binary. Every field is optional: absence
/// means "use the environment-derived value", never a second default.
#[derive(Parser, Debug)]
#[command(name = "processor", about = "Runs the article ingestion/clustering loop")]
pub struct Cli {
    #[arg(long)]
    pub database_path: Option<String>,

    #[arg(long)]
    pub similarity_threshold: Option<f32>,

    #[arg(long)]
    pub max_concurrency: Option<usize>,

    #[arg(long)]
    pub max_articles_per_run: Option<u32>,

    /// Run one audit pass and exit instead of starting the processor loop.
    #[arg(long, default_value_t = false)]
    pub audit_once: bool,
}
