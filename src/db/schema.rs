use tracing::info;

use super::core::Database;
use crate::TARGET_STORE;

impl Database {
    pub(crate) async fn initialize_schema(&self) -> Result<(), sqlx::Error> {
        let mut conn = self.pool().acquire().await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                original_title TEXT,
                generated_title TEXT,
                excerpt TEXT,
                content TEXT,
                source_domain TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                processed_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_articles_status ON articles (status);
            CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles (created_at);

            CREATE TABLE IF NOT EXISTS processing_queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL,
                priority INTEGER NOT NULL DEFAULT 1,
                status TEXT NOT NULL DEFAULT 'queued',
                created_at TEXT NOT NULL,
                started_at TEXT,
                completed_at TEXT,
                error_message TEXT,
                FOREIGN KEY (article_id) REFERENCES articles (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_processing_queue_status ON processing_queue (status);

            CREATE TABLE IF NOT EXISTS clusters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                summary TEXT NOT NULL,
                article_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS article_clusters (
                article_id INTEGER NOT NULL,
                cluster_id INTEGER NOT NULL,
                similarity_score REAL NOT NULL,
                added_at TEXT NOT NULL,
                PRIMARY KEY (article_id, cluster_id),
                FOREIGN KEY (article_id) REFERENCES articles (id) ON DELETE CASCADE,
                FOREIGN KEY (cluster_id) REFERENCES clusters (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_article_clusters_cluster_id ON article_clusters (cluster_id);

            CREATE TABLE IF NOT EXISTS system_status (
                status_id INTEGER PRIMARY KEY CHECK (status_id = 1),
                last_processed_article INTEGER,
                total_articles INTEGER NOT NULL DEFAULT 0,
                total_clusters INTEGER NOT NULL DEFAULT 0,
                last_activity TEXT,
                is_running INTEGER NOT NULL DEFAULT 0
            );
            INSERT OR IGNORE INTO system_status (status_id, total_articles, total_clusters, is_running)
                VALUES (1, 0, 0, 0);

            CREATE TABLE IF NOT EXISTS entities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                normalized_name TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                UNIQUE (normalized_name, entity_type)
            );

            CREATE TABLE IF NOT EXISTS article_entities (
                article_id INTEGER NOT NULL,
                entity_id INTEGER NOT NULL,
                importance TEXT NOT NULL,
                PRIMARY KEY (article_id, entity_id),
                FOREIGN KEY (article_id) REFERENCES articles (id) ON DELETE CASCADE,
                FOREIGN KEY (entity_id) REFERENCES entities (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_article_entities_article_id ON article_entities (article_id);

            CREATE TABLE IF NOT EXISTS cluster_evaluations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cluster_id INTEGER NOT NULL,
                metrics_json TEXT NOT NULL,
                label TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (cluster_id) REFERENCES clusters (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_cluster_evaluations_cluster_id ON cluster_evaluations (cluster_id);

            CREATE TABLE IF NOT EXISTS cluster_feedback (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cluster_id INTEGER NOT NULL,
                label TEXT NOT NULL,
                note TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (cluster_id) REFERENCES clusters (id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS cluster_params_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                similarity_threshold REAL NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await?;
        info!(target: TARGET_STORE, "schema ensured");

        Ok(())
    }
}
