mod article;
mod audit;
mod cluster;
pub mod core;
mod entity;
mod queue;
mod schema;

pub use core::{Database, DbLockErrorExt};

use serde::Serialize;

/// Article lifecycle status (§3 DATA MODEL). Monotonically non-reversing
/// except by explicit admin action, which this crate does not implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Processing => "processing",
            ArticleStatus::Completed => "completed",
            ArticleStatus::Failed => "failed",
        }
    }
}

impl From<&str> for ArticleStatus {
    fn from(s: &str) -> Self {
        match s {
            "processing" => ArticleStatus::Processing,
            "completed" => ArticleStatus::Completed,
            "failed" => ArticleStatus::Failed,
            _ => ArticleStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub original_title: Option<String>,
    pub generated_title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub source_domain: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub processed_at: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleUpdate {
    pub status: Option<ArticleStatus>,
    pub generated_title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub source_domain: Option<String>,
    pub processed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cluster {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub article_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterWithArticles {
    pub cluster: Cluster,
    pub articles: Vec<Article>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Queued => "queued",
            QueueStatus::Processing => "processing",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: i64,
    pub article_id: i64,
    pub priority: i64,
    pub status: String,
    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub last_processed_article: Option<i64>,
    pub total_articles: i64,
    pub total_clusters: i64,
    pub last_activity: Option<String>,
    pub is_running: bool,
}

#[derive(Debug, Clone)]
pub struct ClusterEvaluation {
    pub id: i64,
    pub cluster_id: i64,
    pub metrics_json: String,
    pub label: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ClusterParams {
    pub similarity_threshold: f32,
    pub created_at: String,
}
