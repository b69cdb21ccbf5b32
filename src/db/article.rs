use tracing::{info, instrument};

use super::core::{with_lock_retry, Database};
use super::{Article, ArticleUpdate};
use crate::TARGET_STORE;

impl Database {
    /// Idempotent on `url`: a second call with the same URL returns the
    /// existing `article_id` rather than erroring, per the submission
    /// interface's contract. The `bool` reports whether a row was newly
    /// inserted, so callers that enqueue on insert (`Pipeline::submit`) don't
    /// double-enqueue a repeat URL.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn add_article(
        &self,
        url: &str,
        original_title: Option<&str>,
    ) -> Result<(i64, bool), sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();
        with_lock_retry(|| async {
            let inserted: Option<i64> = sqlx::query_scalar(
                r#"
                INSERT INTO articles (url, original_title, status, created_at, updated_at)
                VALUES (?, ?, 'pending', ?, ?)
                ON CONFLICT(url) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(url)
            .bind(original_title)
            .bind(&now)
            .bind(&now)
            .fetch_optional(self.pool())
            .await?;

            match inserted {
                Some(id) => Ok((id, true)),
                None => {
                    let id: i64 = sqlx::query_scalar("SELECT id FROM articles WHERE url = ?")
                        .bind(url)
                        .fetch_one(self.pool())
                        .await?;
                    Ok((id, false))
                }
            }
        })
        .await
    }

    #[instrument(target = "db", level = "info", skip(self, update))]
    pub async fn update_article(
        &self,
        article_id: i64,
        update: &ArticleUpdate,
    ) -> Result<(), sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();
        with_lock_retry(|| async {
            sqlx::query(
                r#"
                UPDATE articles SET
                    status = COALESCE(?, status),
                    generated_title = COALESCE(?, generated_title),
                    excerpt = COALESCE(?, excerpt),
                    content = COALESCE(?, content),
                    source_domain = COALESCE(?, source_domain),
                    processed_at = COALESCE(?, processed_at),
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(update.status.map(|s| s.as_str()))
            .bind(update.generated_title.as_deref())
            .bind(update.excerpt.as_deref())
            .bind(update.content.as_deref())
            .bind(update.source_domain.as_deref())
            .bind(update.processed_at.as_deref())
            .bind(&now)
            .bind(article_id)
            .execute(self.pool())
            .await?;
            Ok(())
        })
        .await?;
        info!(target: TARGET_STORE, article_id, "article updated");
        Ok(())
    }

    pub async fn get_article(&self, article_id: i64) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as::<_, ArticleRow>("SELECT * FROM articles WHERE id = ?")
            .bind(article_id)
            .fetch_optional(self.pool())
            .await
            .map(|r| r.map(Into::into))
    }

    pub async fn get_article_by_url(&self, url: &str) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as::<_, ArticleRow>("SELECT * FROM articles WHERE url = ?")
            .bind(url)
            .fetch_optional(self.pool())
            .await
            .map(|r| r.map(Into::into))
    }

    /// Up to `limit` recent articles, newest first. Used by the clusterer's
    /// candidate retrieval (§4.4 Step 1), which explicitly wants
    /// `processing` rows included alongside `completed` ones.
    pub async fn get_recent_articles(
        &self,
        limit: u32,
        include_processing: bool,
    ) -> Result<Vec<Article>, sqlx::Error> {
        let query = if include_processing {
            "SELECT * FROM articles WHERE status IN ('completed', 'processing') ORDER BY created_at DESC LIMIT ?"
        } else {
            "SELECT * FROM articles WHERE status = 'completed' ORDER BY created_at DESC LIMIT ?"
        };
        let rows: Vec<ArticleRow> = sqlx::query_as(query)
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Completed articles with no cluster membership, most recently updated
    /// first, restricted to the last `window_hours`. Backs both the feed's
    /// `list_singletons` and the Processor's singleton sweep.
    pub async fn get_singleton_articles(
        &self,
        limit: u32,
        window_hours: Option<i64>,
    ) -> Result<Vec<Article>, sqlx::Error> {
        let rows: Vec<ArticleRow> = if let Some(hours) = window_hours {
            let threshold = (chrono::Utc::now() - chrono::Duration::hours(hours)).to_rfc3339();
            sqlx::query_as(
                r#"
                SELECT a.* FROM articles a
                LEFT JOIN article_clusters ac ON ac.article_id = a.id
                WHERE a.status = 'completed' AND ac.article_id IS NULL AND a.created_at >= ?
                ORDER BY a.updated_at DESC LIMIT ?
                "#,
            )
            .bind(threshold)
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as(
                r#"
                SELECT a.* FROM articles a
                LEFT JOIN article_clusters ac ON ac.article_id = a.id
                WHERE a.status = 'completed' AND ac.article_id IS NULL
                ORDER BY a.updated_at DESC LIMIT ?
                "#,
            )
            .bind(limit as i64)
            .fetch_all(self.pool())
            .await?
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
pub(super) struct ArticleRow {
    id: i64,
    url: String,
    original_title: Option<String>,
    generated_title: Option<String>,
    excerpt: Option<String>,
    content: Option<String>,
    source_domain: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
    processed_at: Option<String>,
}

impl From<ArticleRow> for Article {
    fn from(r: ArticleRow) -> Self {
        Article {
            id: r.id,
            url: r.url,
            original_title: r.original_title,
            generated_title: r.generated_title,
            excerpt: r.excerpt,
            content: r.content,
            source_domain: r.source_domain,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
            processed_at: r.processed_at,
        }
    }
}
