use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::clusterer::{self, content_tokens, cosine, tfidf_vectors};
use crate::db::{ClusterEvaluation, ClusterParams, Database};
use crate::entity;
use crate::TARGET_AUDIT;

const DEFAULT_LIMIT: u32 = 50;
const THRESHOLD_STEP: f32 = 0.02;
const THRESHOLD_MIN: f32 = 0.16;
const THRESHOLD_MAX: f32 = 0.28;

/// §4.5's literal classification rule, checked in this order.
const CORRECT_MIN_SIZE: usize = 3;
const CORRECT_MIN_COHESION: f32 = 0.22;
const CORRECT_MIN_SEPARATION: f32 = 0.65;
const SPLIT_MIN_SIZE: usize = 2;
const SPLIT_MAX_COHESION: f32 = 0.12;
const MERGE_MIN_SIZE: usize = 2;
const MERGE_MAX_SEPARATION: f32 = 0.40;

#[derive(Debug, Serialize)]
struct ClusterMetrics {
    cohesion_mean: f32,
    cohesion_median: f32,
    separation_min: f32,
    title_overlap_rate: f32,
    entity_overlap_rate: f32,
    member_count: i64,
}

/// Offline cluster-quality routine (§4.6). Owns no state of its own beyond
/// what it reads from and writes to the Store on each call; the Processor's
/// watchdog cycle or an operator invokes it on demand.
pub struct Audit {
    db: Arc<Database>,
}

impl Audit {
    pub fn new(db: Arc<Database>) -> Self {
        Audit { db }
    }

    /// Computes and persists cohesion/separation metrics and a label for up
    /// to `limit` recent non-empty clusters.
    pub async fn run_audit(&self, limit: Option<u32>) -> Result<Vec<ClusterEvaluation>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let clusters = self.db.get_clusters(limit).await?;

        // Per-cluster member titles and combined texts, gathered up front so
        // separation can compare each cluster against every other one.
        let mut per_cluster: Vec<(i64, Vec<String>, Vec<String>)> = Vec::with_capacity(clusters.len());
        for cluster in &clusters {
            let members = self.db.get_cluster_articles(cluster.id).await?;
            let titles: Vec<String> = members
                .iter()
                .filter_map(|a| a.generated_title.clone())
                .collect();
            let texts: Vec<String> = members
                .iter()
                .map(|a| clusterer::combined_text_of(&a.generated_title, &a.excerpt, &a.content))
                .filter(|t| !t.trim().is_empty())
                .collect();
            per_cluster.push((cluster.id, titles, texts));
        }

        let mut evaluations = Vec::with_capacity(clusters.len());

        for (i, cluster) in clusters.iter().enumerate() {
            let (_, titles, texts) = &per_cluster[i];
            let member_count = texts.len();

            let (cohesion_mean, cohesion_median) = cohesion(texts);
            let separation_min = separation(texts, &per_cluster, i);
            let title_overlap_rate = pairwise_overlap_rate(titles, content_tokens);
            let entity_overlap_rate = pairwise_overlap_rate(titles, |t| entity::named_entity_set(t));

            let label = classify_cluster(cohesion_mean, separation_min, member_count);
            let metrics = ClusterMetrics {
                cohesion_mean,
                cohesion_median,
                separation_min,
                title_overlap_rate,
                entity_overlap_rate,
                member_count: member_count as i64,
            };
            let metrics_json = serde_json::to_string(&metrics).unwrap_or_else(|_| "{}".to_string());

            let id = self
                .db
                .insert_cluster_evaluation(cluster.id, &metrics_json, label)
                .await?;

            evaluations.push(ClusterEvaluation {
                id,
                cluster_id: cluster.id,
                metrics_json,
                label: label.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            });
        }

        info!(target: TARGET_AUDIT, count = evaluations.len(), "audit pass complete");
        Ok(evaluations)
    }

    /// Nudges the similarity threshold by the majority label bias among
    /// `evaluations` and persists it as a new advisory history row. Never
    /// applied to a live `Clusterer` within the same process (§9).
    pub async fn propose_params(&self, evaluations: &[ClusterEvaluation]) -> Result<ClusterParams, sqlx::Error> {
        let current = self
            .db
            .get_current_cluster_params()
            .await?
            .map(|p| p.similarity_threshold)
            .unwrap_or(0.22);

        let split_needed = evaluations.iter().filter(|e| e.label == "split_needed").count();
        let should_merge = evaluations.iter().filter(|e| e.label == "should_merge").count();

        let proposed = if split_needed > should_merge {
            current - THRESHOLD_STEP
        } else if should_merge > split_needed {
            current + THRESHOLD_STEP
        } else {
            current
        }
        .clamp(THRESHOLD_MIN, THRESHOLD_MAX);

        self.db.save_cluster_params(proposed).await?;
        info!(target: TARGET_AUDIT, previous = current, proposed, "proposed new similarity threshold");

        Ok(ClusterParams {
            similarity_threshold: proposed,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Thin wrapper over `Store.insert_cluster_feedback`. The only
    /// externally-writable audit surface; the pipeline never calls this
    /// itself.
    pub async fn record_feedback(
        &self,
        cluster_id: i64,
        label: &str,
        note: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        self.db.insert_cluster_feedback(cluster_id, label, note).await
    }
}

/// Mean and median of pairwise TF-IDF cosine similarity between every pair
/// of member texts in a cluster. A singleton (or empty) cluster is fully
/// cohesive by convention.
fn cohesion(texts: &[String]) -> (f32, f32) {
    if texts.len() < 2 {
        return (1.0, 1.0);
    }
    let mut scores = Vec::new();
    for i in 0..texts.len() {
        for j in (i + 1)..texts.len() {
            scores.push(pair_similarity(&texts[i], &texts[j]));
        }
    }
    let mean = scores.iter().sum::<f32>() / scores.len() as f32;
    (mean, median(&mut scores))
}

/// `1 - best_cross`, where `best_cross` is the highest similarity between
/// this cluster's joined member text and any other cluster's joined member
/// text. A cluster with no peers to compare against is maximally separated.
fn separation(texts: &[String], per_cluster: &[(i64, Vec<String>, Vec<String>)], self_index: usize) -> f32 {
    if texts.is_empty() {
        return 1.0;
    }
    let joined = texts.join(" ");
    let best_cross = per_cluster
        .iter()
        .enumerate()
        .filter(|(j, (_, _, other_texts))| *j != self_index && !other_texts.is_empty())
        .map(|(_, (_, _, other_texts))| pair_similarity(&joined, &other_texts.join(" ")))
        .fold(0.0f32, f32::max);
    if per_cluster.len() <= 1 {
        1.0
    } else {
        1.0 - best_cross
    }
}

/// Vectorizes just the two texts being compared, matching the Clusterer's
/// own stateless per-call TF-IDF fit.
fn pair_similarity(a: &str, b: &str) -> f32 {
    let vectors = tfidf_vectors(&[a, b]);
    cosine(&vectors[0], &vectors[1])
}

fn median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 1.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Fraction of title pairs in the cluster that share at least one token
/// under `extract` (content tokens for `title_overlap_rate`, named entities
/// for `entity_overlap_rate`). A singleton cluster has no pairs to compare,
/// so it's reported as fully overlapping.
fn pairwise_overlap_rate<F>(titles: &[String], extract: F) -> f32
where
    F: Fn(&str) -> std::collections::HashSet<String>,
{
    if titles.len() < 2 {
        return 1.0;
    }
    let sets: Vec<_> = titles.iter().map(|t| extract(t)).collect();
    let mut overlapping = 0u32;
    let mut pairs = 0u32;
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            pairs += 1;
            if !sets[i].is_disjoint(&sets[j]) {
                overlapping += 1;
            }
        }
    }
    overlapping as f32 / pairs as f32
}

fn classify_cluster(cohesion_mean: f32, separation_min: f32, member_count: usize) -> &'static str {
    if member_count >= CORRECT_MIN_SIZE
        && cohesion_mean >= CORRECT_MIN_COHESION
        && separation_min >= CORRECT_MIN_SEPARATION
    {
        return "correct";
    }
    if member_count >= SPLIT_MIN_SIZE && cohesion_mean < SPLIT_MAX_COHESION {
        return "split_needed";
    }
    if member_count >= MERGE_MIN_SIZE && separation_min < MERGE_MAX_SEPARATION {
        return "should_merge";
    }
    "mixed"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_member_cluster_is_fully_cohesive_and_separated() {
        let texts = vec!["Storm hits Michigan towns hard".to_string()];
        assert_eq!(cohesion(&texts), (1.0, 1.0));
    }

    #[test]
    fn low_cohesion_large_cluster_needs_split() {
        let label = classify_cluster(0.05, 0.5, 4);
        assert_eq!(label, "split_needed");
    }

    #[test]
    fn low_separation_pair_proposes_merge() {
        let label = classify_cluster(0.8, 0.1, 2);
        assert_eq!(label, "should_merge");
    }

    #[test]
    fn well_formed_triple_is_correct() {
        let label = classify_cluster(0.5, 0.8, 3);
        assert_eq!(label, "correct");
    }

    #[test]
    fn small_middling_cluster_is_mixed() {
        let label = classify_cluster(0.5, 0.5, 2);
        assert_eq!(label, "mixed");
    }

    #[test]
    fn overlap_rate_is_one_when_every_pair_shares_a_token() {
        let titles = vec![
            "Bridge collapses in Ohio".to_string(),
            "Ohio bridge collapse kills none".to_string(),
        ];
        assert_eq!(pairwise_overlap_rate(&titles, content_tokens), 1.0);
    }
}
