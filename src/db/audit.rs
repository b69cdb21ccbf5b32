use tracing::instrument;

use super::core::{with_lock_retry, Database};
use super::{ClusterEvaluation, ClusterParams};
use crate::TARGET_STORE;

impl Database {
    #[instrument(target = "db", level = "info", skip(self, metrics_json))]
    pub async fn insert_cluster_evaluation(
        &self,
        cluster_id: i64,
        metrics_json: &str,
        label: &str,
    ) -> Result<i64, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();
        with_lock_retry(|| async {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO cluster_evaluations (cluster_id, metrics_json, label, created_at) VALUES (?, ?, ?, ?) RETURNING id",
            )
            .bind(cluster_id)
            .bind(metrics_json)
            .bind(label)
            .bind(&now)
            .fetch_one(self.pool())
            .await?;
            Ok(id)
        })
        .await
    }

    pub async fn get_cluster_evaluations(
        &self,
        cluster_id: i64,
    ) -> Result<Vec<ClusterEvaluation>, sqlx::Error> {
        let rows: Vec<EvaluationRow> = sqlx::query_as(
            "SELECT * FROM cluster_evaluations WHERE cluster_id = ? ORDER BY created_at DESC",
        )
        .bind(cluster_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Human feedback ("merge", "split", "ok") attached to a cluster by an
    /// operator. Never read back by the Processor itself; the Audit
    /// component surfaces it for `propose_params`.
    #[instrument(target = "db", level = "info", skip(self, note))]
    pub async fn insert_cluster_feedback(
        &self,
        cluster_id: i64,
        label: &str,
        note: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();
        with_lock_retry(|| async {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO cluster_feedback (cluster_id, label, note, created_at) VALUES (?, ?, ?, ?) RETURNING id",
            )
            .bind(cluster_id)
            .bind(label)
            .bind(note)
            .bind(&now)
            .fetch_one(self.pool())
            .await?;
            Ok(id)
        })
        .await
    }

    /// Records a new similarity threshold as history. This is advisory:
    /// nothing reads this table back into a running Clusterer, per the
    /// decision that audit output never auto-applies.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn save_cluster_params(&self, similarity_threshold: f32) -> Result<(), sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();
        with_lock_retry(|| async {
            sqlx::query(
                "INSERT INTO cluster_params_history (similarity_threshold, created_at) VALUES (?, ?)",
            )
            .bind(similarity_threshold)
            .bind(&now)
            .execute(self.pool())
            .await?;
            Ok(())
        })
        .await
    }

    pub async fn get_current_cluster_params(&self) -> Result<Option<ClusterParams>, sqlx::Error> {
        sqlx::query_as::<_, ParamsRow>(
            "SELECT similarity_threshold, created_at FROM cluster_params_history ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(self.pool())
        .await
        .map(|r| r.map(Into::into))
    }
}

#[derive(sqlx::FromRow)]
struct EvaluationRow {
    id: i64,
    cluster_id: i64,
    metrics_json: String,
    label: String,
    created_at: String,
}

impl From<EvaluationRow> for ClusterEvaluation {
    fn from(r: EvaluationRow) -> Self {
        ClusterEvaluation {
            id: r.id,
            cluster_id: r.cluster_id,
            metrics_json: r.metrics_json,
            label: r.label,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ParamsRow {
    similarity_threshold: f32,
    created_at: String,
}

impl From<ParamsRow> for ClusterParams {
    fn from(r: ParamsRow) -> Self {
        ClusterParams {
            similarity_threshold: r.similarity_threshold,
            created_at: r.created_at,
        }
    }
}
