mod classify;
mod gating;
mod semantic;
mod signature;
mod similarity;
mod summary;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::db::Database;
use crate::entity::{self, ExtractedEntities};
use crate::error::ClusterDecision;
use crate::TARGET_CLUSTERER;

pub use semantic::{CandleEmbedder, NullEmbedder, SemanticEmbedder};
pub use similarity::{content_tokens, cosine, tfidf_vectors, title_similarity};

use classify::{classify, ArticleType};
use gating::{passes_gates, GateInputs};

const TIME_WINDOW_HOURS: i64 = 72;
const CONTENT_PREVIEW_CHARS: usize = 1500;
const CANDIDATES_TO_KEEP: usize = 10;
const MAX_FOUNDING_PEERS: usize = 3;

struct Weights {
    lexical: f32,
    location: f32,
    event: f32,
}

const BREAKING_WEIGHTS: Weights = Weights {
    lexical: 0.6,
    location: 0.3,
    event: 0.1,
};
const POLICY_WEIGHTS: Weights = Weights {
    lexical: 0.45,
    location: 0.35,
    event: 0.20,
};

const POLICY_DEFAULT_THRESHOLD: f32 = 0.16;

struct Candidate {
    article_id: i64,
    title: String,
    text: String,
    source_domain: String,
    created_at: DateTime<Utc>,
    entities: ExtractedEntities,
}

/// Given a newly-completed article, decides cluster membership
/// conservatively per §4.4. Rebuilds its TF-IDF vectorizer fresh on every
/// call so it stays stateless and safe under concurrent callers (§5).
pub struct Clusterer {
    db: Arc<Database>,
    embedder: Arc<dyn SemanticEmbedder>,
    candidate_pool_size: u32,
    similarity_threshold: f32,
    semantic_weight: f32,
}

impl Clusterer {
    pub fn new(
        db: Arc<Database>,
        embedder: Arc<dyn SemanticEmbedder>,
        candidate_pool_size: u32,
        similarity_threshold: f32,
        semantic_weight: f32,
    ) -> Self {
        Clusterer {
            db,
            embedder,
            candidate_pool_size,
            similarity_threshold,
            semantic_weight,
        }
    }

    pub async fn cluster(&self, article_id: i64, combined_text: &str) -> Result<ClusterDecision, sqlx::Error> {
        let article = match self.db.get_article(article_id).await? {
            Some(a) => a,
            None => return Ok(ClusterDecision::Singleton),
        };
        let current_title = article.generated_title.clone().unwrap_or_default();
        let current_domain = article.source_domain.clone().unwrap_or_default();
        let current_created_at = parse_timestamp(&article.created_at);
        let current_entities = entity::extract_entities(combined_text);

        if let Err(e) = self
            .db
            .save_article_entities(article_id, &current_entities)
            .await
        {
            warn!(target: TARGET_CLUSTERER, article_id, error = %e, "failed to persist entities");
        }

        let article_type = classify(combined_text);
        // `similarity_threshold` tunes the breaking-story threshold (what the
        // audit proposer adjusts); the policy threshold is fixed per §4.4.
        let (weights, threshold) = match article_type {
            ArticleType::Breaking => (&BREAKING_WEIGHTS, self.similarity_threshold),
            ArticleType::Policy => (&POLICY_WEIGHTS, POLICY_DEFAULT_THRESHOLD),
        };

        let recent = self
            .db
            .get_recent_articles(self.candidate_pool_size, true)
            .await?;

        let mut candidates = Vec::new();
        for row in recent.into_iter().filter(|a| a.id != article_id) {
            let text = combined_text_of(&row.generated_title, &row.excerpt, &row.content);
            if text.trim().is_empty() {
                continue;
            }
            let entities = entity::extract_entities(&text);
            candidates.push(Candidate {
                article_id: row.id,
                title: row.generated_title.clone().unwrap_or_default(),
                text,
                source_domain: row.source_domain.clone().unwrap_or_default(),
                created_at: parse_timestamp(&row.created_at),
                entities,
            });
        }

        if candidates.is_empty() {
            info!(target: TARGET_CLUSTERER, article_id, "no candidates available");
            return Ok(ClusterDecision::Singleton);
        }

        let mut documents: Vec<&str> = Vec::with_capacity(candidates.len() + 1);
        documents.push(combined_text);
        for c in &candidates {
            documents.push(&c.text);
        }
        let tfidf_vectors = similarity::tfidf_vectors(&documents);

        let semantic_current = if self.semantic_weight > 0.0 {
            self.embedder.embed(combined_text).await
        } else {
            None
        };

        let current_location_set = current_entities.normalized_names_by_type(crate::entity::EntityType::Location);
        let current_event_set = current_entities.normalized_names_by_type(crate::entity::EntityType::Event);
        let current_tokens = similarity::content_tokens(combined_text);
        let current_signature = signature::story_signature(&current_title, &current_entities);

        let mut accepted: Vec<(f32, &Candidate)> = Vec::new();

        for (i, candidate) in candidates.iter().enumerate() {
            let lexical = similarity::cosine(&tfidf_vectors[0], &tfidf_vectors[i + 1]);

            let candidate_location_set =
                candidate.entities.normalized_names_by_type(crate::entity::EntityType::Location);
            let candidate_event_set =
                candidate.entities.normalized_names_by_type(crate::entity::EntityType::Event);
            let location_overlap = similarity::jaccard(&current_location_set, &candidate_location_set);
            let event_overlap = similarity::jaccard(&current_event_set, &candidate_event_set);

            let semantic_score = if let Some(current_vec) = &semantic_current {
                if let Some(candidate_vec) = self.embedder.embed(&candidate.text).await {
                    semantic::cosine(current_vec, &candidate_vec)
                } else {
                    0.0
                }
            } else {
                0.0
            };

            let mut score = weights.lexical * lexical
                + self.semantic_weight * semantic_score
                + weights.location * location_overlap
                + weights.event * event_overlap;

            if matches!(article_type, ArticleType::Policy) {
                let shared_uk = current_location_set.contains("united kingdom")
                    && candidate_location_set.contains("united kingdom");
                let shared_digital_terms = combined_text.to_lowercase().contains("digital")
                    && candidate.text.to_lowercase().contains("digital");
                if shared_uk && shared_digital_terms {
                    score += 0.03;
                }
            }

            let title_similarity = similarity::title_similarity(&current_title, &candidate.title);
            let candidate_tokens = similarity::content_tokens(&candidate.text);
            let token_jaccard = similarity::jaccard(&current_tokens, &candidate_tokens);
            let time_ok = (current_created_at - candidate.created_at).num_hours().abs() <= TIME_WINDOW_HOURS;

            let shared_locations_empty = current_location_set.is_disjoint(&candidate_location_set);
            let shared_events_empty = current_event_set.is_disjoint(&candidate_event_set);
            let current_named = current_entities.normalized_names_by_type(crate::entity::EntityType::Organization);
            let candidate_named = candidate.entities.normalized_names_by_type(crate::entity::EntityType::Organization);
            let shared_named_empty = current_named.is_disjoint(&candidate_named);

            let entity_overlap_flag = !shared_locations_empty || !shared_events_empty || !shared_named_empty;
            let geography_only_overlap = !shared_locations_empty && shared_events_empty && shared_named_empty;

            let candidate_signature = signature::story_signature(&candidate.title, &candidate.entities);
            let sig_overlap = signature::signature_overlap(&current_signature, &candidate_signature);

            let gate_inputs = GateInputs {
                title_similarity,
                token_jaccard,
                time_ok,
                entity_overlap: entity_overlap_flag,
                signature_overlap: sig_overlap,
                same_domain: candidate.source_domain == current_domain && !current_domain.is_empty(),
                geography_only_overlap,
            };

            if score >= threshold && passes_gates(&gate_inputs) {
                accepted.push((score, candidate));
            }
        }

        accepted.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        accepted.truncate(CANDIDATES_TO_KEEP);

        if accepted.is_empty() {
            info!(target: TARGET_CLUSTERER, article_id, "no candidates passed gating");
            return Ok(ClusterDecision::Singleton);
        }

        for (score, candidate) in &accepted {
            let existing_clusters = self.db.get_article_clusters(candidate.article_id).await?;
            if let Some(cluster) = existing_clusters.into_iter().next() {
                self.db.add_to_cluster(article_id, cluster.id, *score).await?;
                info!(target: TARGET_CLUSTERER, article_id, cluster_id = cluster.id, similarity = score, "joined existing cluster");
                return Ok(ClusterDecision::Joined {
                    cluster_id: cluster.id,
                    similarity: *score,
                });
            }
        }

        let has_cross_domain = accepted
            .iter()
            .any(|(_, c)| c.source_domain != current_domain && !c.source_domain.is_empty());
        if !has_cross_domain {
            info!(target: TARGET_CLUSTERER, article_id, "no cross-domain corroboration, remaining singleton");
            return Ok(ClusterDecision::Singleton);
        }

        let peers: Vec<&Candidate> = accepted
            .iter()
            .filter(|(_, c)| c.source_domain != current_domain && !c.source_domain.is_empty())
            .take(MAX_FOUNDING_PEERS)
            .map(|(_, c)| *c)
            .collect();

        let mut member_titles: Vec<&str> = vec![&current_title];
        member_titles.extend(peers.iter().map(|p| p.title.as_str()));
        let mut member_texts: Vec<&str> = vec![combined_text];
        member_texts.extend(peers.iter().map(|p| p.text.as_str()));

        let title = summary::generate_title(&member_titles, &member_texts);
        let cluster_summary = summary::generate_summary(&member_texts);

        let cluster_id = self.db.create_cluster(&title, &cluster_summary).await?;

        let self_similarity = accepted
            .iter()
            .find(|(_, c)| peers.iter().any(|p| p.article_id == c.article_id))
            .map(|(score, _)| *score)
            .unwrap_or(threshold);
        self.db.add_to_cluster(article_id, cluster_id, self_similarity).await?;

        let mut peer_ids = Vec::new();
        for (score, candidate) in accepted.iter().filter(|(_, c)| peers.iter().any(|p| p.article_id == c.article_id)) {
            self.db.add_to_cluster(candidate.article_id, cluster_id, *score).await?;
            peer_ids.push(candidate.article_id);
        }

        info!(target: TARGET_CLUSTERER, article_id, cluster_id, peers = peer_ids.len(), "founded new cluster");
        Ok(ClusterDecision::Founded {
            cluster_id,
            peers: peer_ids,
        })
    }
}

/// Builds the same `title excerpt content[:1500]` text the Clusterer scores
/// candidates against, shared with the Audit so its cohesion/separation
/// metrics measure the signal that actually founded/joined clusters.
pub(crate) fn combined_text_of(title: &Option<String>, excerpt: &Option<String>, content: &Option<String>) -> String {
    let title = title.as_deref().unwrap_or("");
    let excerpt = excerpt.as_deref().unwrap_or("");
    let preview: String = content
        .as_deref()
        .unwrap_or("")
        .chars()
        .take(CONTENT_PREVIEW_CHARS)
        .collect();
    format!("{title} {excerpt} {preview}")
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
