use tracing::instrument;

use super::core::{with_lock_retry, Database};
use super::{Article, Cluster};
use crate::TARGET_STORE;

impl Database {
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn create_cluster(&self, title: &str, summary: &str) -> Result<i64, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();
        with_lock_retry(|| async {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO clusters (title, summary, article_count, created_at, updated_at) VALUES (?, ?, 0, ?, ?) RETURNING id",
            )
            .bind(title)
            .bind(summary)
            .bind(&now)
            .bind(&now)
            .fetch_one(self.pool())
            .await?;
            Ok(id)
        })
        .await
    }

    /// Upserts membership and recomputes `clusters.article_count` from the
    /// join table, keeping §3's invariant `article_count = |members|` true
    /// by construction rather than by incrementing a counter.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn add_to_cluster(
        &self,
        article_id: i64,
        cluster_id: i64,
        similarity: f32,
    ) -> Result<(), sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();
        with_lock_retry(|| async {
            let mut tx = self.pool().begin().await?;
            sqlx::query(
                r#"
                INSERT INTO article_clusters (article_id, cluster_id, similarity_score, added_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(article_id, cluster_id) DO UPDATE SET similarity_score = excluded.similarity_score
                "#,
            )
            .bind(article_id)
            .bind(cluster_id)
            .bind(similarity)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE clusters SET
                    article_count = (SELECT COUNT(*) FROM article_clusters WHERE cluster_id = ?),
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(cluster_id)
            .bind(&now)
            .bind(cluster_id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    pub async fn get_cluster(&self, cluster_id: i64) -> Result<Option<Cluster>, sqlx::Error> {
        sqlx::query_as::<_, ClusterRow>("SELECT * FROM clusters WHERE id = ?")
            .bind(cluster_id)
            .fetch_optional(self.pool())
            .await
            .map(|r| r.map(Into::into))
    }

    pub async fn get_clusters(&self, limit: u32) -> Result<Vec<Cluster>, sqlx::Error> {
        let rows: Vec<ClusterRow> = sqlx::query_as(
            "SELECT * FROM clusters WHERE article_count > 0 ORDER BY updated_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get_cluster_articles(&self, cluster_id: i64) -> Result<Vec<Article>, sqlx::Error> {
        let rows: Vec<super::article::ArticleRow> = sqlx::query_as(
            r#"
            SELECT a.* FROM articles a
            JOIN article_clusters ac ON ac.article_id = a.id
            WHERE ac.cluster_id = ?
            ORDER BY ac.added_at ASC
            "#,
        )
        .bind(cluster_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// The clusters (if any) a single article belongs to. In the current
    /// policy this is 0 or 1, but the schema permits more.
    pub async fn get_article_clusters(&self, article_id: i64) -> Result<Vec<Cluster>, sqlx::Error> {
        let rows: Vec<ClusterRow> = sqlx::query_as(
            r#"
            SELECT c.* FROM clusters c
            JOIN article_clusters ac ON ac.cluster_id = c.id
            WHERE ac.article_id = ?
            "#,
        )
        .bind(article_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct ClusterRow {
    id: i64,
    title: String,
    summary: String,
    article_count: i64,
    created_at: String,
    updated_at: String,
}

impl From<ClusterRow> for Cluster {
    fn from(r: ClusterRow) -> Self {
        Cluster {
            id: r.id,
            title: r.title,
            summary: r.summary,
            article_count: r.article_count,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
