use tracing::{info, instrument, warn};

use super::core::{with_lock_retry, Database};
use super::QueueItem;
use crate::TARGET_STORE;

impl Database {
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn enqueue(&self, article_id: i64, priority: i64) -> Result<i64, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();
        with_lock_retry(|| async {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO processing_queue (article_id, priority, status, created_at) VALUES (?, ?, 'queued', ?) RETURNING id",
            )
            .bind(article_id)
            .bind(priority)
            .bind(&now)
            .fetch_one(self.pool())
            .await?;
            Ok(id)
        })
        .await
    }

    /// Atomically selects the highest-priority oldest `queued` row, marks it
    /// `processing`, and returns it. The `UPDATE ... WHERE id = (SELECT ...)`
    /// form is what guarantees at-most-one claimant per row under concurrent
    /// callers: SQLite serializes writers, so two simultaneous claimants
    /// cannot both match the same subquery result and both succeed.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn claim_next_queue_item(&self) -> Result<Option<QueueItem>, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();
        with_lock_retry(|| async {
            let mut tx = self.pool().begin().await?;
            let claimed: Option<QueueRow> = sqlx::query_as(
                r#"
                UPDATE processing_queue
                SET status = 'processing', started_at = ?
                WHERE id = (
                    SELECT id FROM processing_queue
                    WHERE status = 'queued'
                    ORDER BY priority DESC, created_at ASC
                    LIMIT 1
                )
                RETURNING *
                "#,
            )
            .bind(&now)
            .fetch_optional(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(claimed.map(Into::into))
        })
        .await
    }

    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn complete_queue_item(
        &self,
        queue_id: i64,
        success: bool,
        error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();
        let status = if success { "completed" } else { "failed" };
        with_lock_retry(|| async {
            sqlx::query(
                "UPDATE processing_queue SET status = ?, completed_at = ?, error_message = ? WHERE id = ?",
            )
            .bind(status)
            .bind(&now)
            .bind(error)
            .bind(queue_id)
            .execute(self.pool())
            .await?;
            Ok(())
        })
        .await
    }

    /// Processor-crash recovery (§7): any `processing` row whose
    /// `started_at` predates `older_than` is reset to `queued` so it gets
    /// picked up again — the work it represents (extraction/normalization)
    /// has no side effect that a retry would double-apply.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn reset_stuck_queue_items(
        &self,
        older_than: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, sqlx::Error> {
        let threshold = older_than.to_rfc3339();
        let result = with_lock_retry(|| async {
            sqlx::query(
                "UPDATE processing_queue SET status = 'queued', started_at = NULL WHERE status = 'processing' AND started_at < ?",
            )
            .bind(&threshold)
            .execute(self.pool())
            .await
        })
        .await?;
        let count = result.rows_affected();
        if count > 0 {
            warn!(target: TARGET_STORE, count, "reset stuck queue items");
        } else {
            info!(target: TARGET_STORE, "no stuck queue items found");
        }
        Ok(count)
    }
}

#[derive(sqlx::FromRow)]
struct QueueRow {
    id: i64,
    article_id: i64,
    priority: i64,
    status: String,
    created_at: String,
    started_at: Option<String>,
    completed_at: Option<String>,
    error_message: Option<String>,
}

impl From<QueueRow> for QueueItem {
    fn from(r: QueueRow) -> Self {
        QueueItem {
            id: r.id,
            article_id: r.article_id,
            priority: r.priority,
            status: r.status,
            created_at: r.created_at,
            started_at: r.started_at,
            completed_at: r.completed_at,
            error_message: r.error_message,
        }
    }
}
