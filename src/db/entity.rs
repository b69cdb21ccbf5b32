use tracing::instrument;

use super::core::{with_lock_retry, Database};
use crate::entity::{Entity, EntityType, ExtractedEntities, ImportanceLevel};
use crate::TARGET_STORE;

impl Database {
    /// Inserts the entity row if new, otherwise returns the existing id.
    /// Entities are keyed on `(normalized_name, entity_type)`, so "UK" and
    /// "Britain" collapse to one row once `entity::aliases::canonicalize`
    /// has run upstream.
    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn upsert_entity(&self, entity: &Entity) -> Result<i64, sqlx::Error> {
        let entity_type = entity.entity_type.to_string();
        with_lock_retry(|| async {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO entities (name, normalized_name, entity_type)
                VALUES (?, ?, ?)
                ON CONFLICT(normalized_name, entity_type) DO UPDATE SET name = excluded.name
                RETURNING id
                "#,
            )
            .bind(&entity.name)
            .bind(&entity.normalized_name)
            .bind(&entity_type)
            .fetch_one(self.pool())
            .await?;
            Ok(id)
        })
        .await
    }

    #[instrument(target = "db", level = "info", skip(self))]
    pub async fn link_article_entity(
        &self,
        article_id: i64,
        entity_id: i64,
        importance: ImportanceLevel,
    ) -> Result<(), sqlx::Error> {
        let importance = importance.to_string();
        with_lock_retry(|| async {
            sqlx::query(
                r#"
                INSERT INTO article_entities (article_id, entity_id, importance)
                VALUES (?, ?, ?)
                ON CONFLICT(article_id, entity_id) DO UPDATE SET importance = excluded.importance
                "#,
            )
            .bind(article_id)
            .bind(entity_id)
            .bind(&importance)
            .execute(self.pool())
            .await?;
            Ok(())
        })
        .await
    }

    /// Convenience wrapper used by the Clusterer: upserts every entity
    /// extracted from an article and links them all in one call.
    pub async fn save_article_entities(
        &self,
        article_id: i64,
        extracted: &ExtractedEntities,
    ) -> Result<(), sqlx::Error> {
        for entity in &extracted.entities {
            let entity_id = self.upsert_entity(entity).await?;
            self.link_article_entity(article_id, entity_id, entity.importance)
                .await?;
        }
        Ok(())
    }

    pub async fn get_article_entities(&self, article_id: i64) -> Result<ExtractedEntities, sqlx::Error> {
        let rows: Vec<EntityRow> = sqlx::query_as(
            r#"
            SELECT e.name, e.normalized_name, e.entity_type, ae.importance
            FROM entities e
            JOIN article_entities ae ON ae.entity_id = e.id
            WHERE ae.article_id = ?
            "#,
        )
        .bind(article_id)
        .fetch_all(self.pool())
        .await?;

        Ok(ExtractedEntities {
            entities: rows.into_iter().map(Into::into).collect(),
        })
    }
}

#[derive(sqlx::FromRow)]
struct EntityRow {
    name: String,
    normalized_name: String,
    entity_type: String,
    importance: String,
}

impl From<EntityRow> for Entity {
    fn from(r: EntityRow) -> Self {
        Entity::new(
            &r.name,
            &r.normalized_name,
            EntityType::from(r.entity_type.as_str()),
        )
        .with_importance(ImportanceLevel::from(r.importance.as_str()))
    }
}
