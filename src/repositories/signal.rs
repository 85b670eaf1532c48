//! # Signal Cache Repository
//!
//! Optional hot-cache persistence for enriched signals (C10 contract
//! `save_signal`). Upserts by `dedupe_key` so re-ingesting the same
//! `(platform, id)` pair twice produces exactly one row (spec §8
//! "Ingesting the same Signal twice produces exactly one accepted record;
//! deduplication is by `(platform, id)`"), matching the same
//! `OnConflict`-upsert idiom as [`crate::repositories::opportunity`].

use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel};

use crate::engines::pain_point::PainPointAssessment;
use crate::engines::quality::QualityScore;
use crate::engines::semantic::SemanticScore;
use crate::error::RepositoryError;
use crate::models::signal::{ActiveModel, Column, Entity as SignalRow, Model, Signal};

pub struct SignalRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SignalRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persists one enriched signal and its attached scores, keyed by the
    /// signal's content-derived `dedupe_key`.
    pub async fn save(
        &self,
        signal: &Signal,
        quality: &QualityScore,
        semantic: &SemanticScore,
        pain: &PainPointAssessment,
    ) -> Result<(), RepositoryError> {
        let model = Model {
            id: signal.id,
            platform: signal.platform,
            author_ref: signal.author_ref.clone(),
            created_at: signal.created_at.into(),
            ingested_at: signal.ingested_at.into(),
            title: signal.title.clone(),
            body: signal.body.clone(),
            engagement: serde_json::to_value(signal.engagement).map_err(RepositoryError::serialization_error)?,
            url: signal.url.clone(),
            dedupe_key: signal.dedupe_key(),
            quality_score: serde_json::to_value(quality).map_err(RepositoryError::serialization_error)?,
            semantic_score: serde_json::to_value(semantic).map_err(RepositoryError::serialization_error)?,
            pain_assessment: serde_json::to_value(pain).map_err(RepositoryError::serialization_error)?,
        };
        let active: ActiveModel = model.into_active_model();

        SignalRow::insert(active)
            .on_conflict(
                OnConflict::column(Column::DedupeKey)
                    .update_columns([
                        Column::Title,
                        Column::Body,
                        Column::Engagement,
                        Column::Url,
                        Column::QualityScore,
                        Column::SemanticScore,
                        Column::PainAssessment,
                        Column::IngestedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::pain_point::PainPointDetector;
    use crate::engines::semantic::LexicalFallbackProvider;
    use crate::engines::semantic::{ModelProvider, SemanticEngine};
    use crate::models::signal::{Engagement, Platform};
    use crate::test_support::test_db;
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_quality() -> QualityScore {
        QualityScore {
            authenticity: 0.7,
            freshness: 0.8,
            relevance: 0.6,
            source_credibility: 0.77,
            content_quality: 0.5,
            engagement_validity: 0.5,
            overall: 0.65,
            accepted: true,
        }
    }

    #[tokio::test]
    async fn saving_the_same_dedupe_key_twice_leaves_one_row() {
        let db = test_db().await;
        let repo = SignalRepository::new(&db);
        let id = Uuid::new_v4();
        let now = Utc::now();
        let signal = Signal::new(
            id,
            Platform::Reddit,
            "u/someone",
            now,
            now,
            "Wish there was a cheaper alternative",
            "Paying too much for this SaaS",
            Engagement {
                upvotes: Some(10),
                comments: Some(2),
                views: None,
            },
            None,
        )
        .unwrap();

        let engine = SemanticEngine::new(LexicalFallbackProvider);
        let text = format!("{} {}", signal.title, signal.body);
        let semantic = engine.analyze(&text).await;
        let pain = PainPointDetector::assess(&text, &semantic, 0.77);
        let quality = sample_quality();

        repo.save(&signal, &quality, &semantic, &pain).await.unwrap();
        repo.save(&signal, &quality, &semantic, &pain).await.unwrap();

        let rows = SignalRow::find().all(&db).await.unwrap();
        let matching: Vec<_> = rows.iter().filter(|r| r.dedupe_key == signal.dedupe_key()).collect();
        assert_eq!(matching.len(), 1);
        let _ = LexicalFallbackProvider.is_fallback();
    }
}
