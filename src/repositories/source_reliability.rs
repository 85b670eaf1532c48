//! # Source Reliability Repository
//!
//! Get/put access keyed by `(platform, author_ref)` (C10 contract).

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};

use crate::error::RepositoryError;
use crate::models::signal::Platform;
use crate::models::source_reliability::{ActiveModel, Entity as SourceReliability, Model};

pub struct SourceReliabilityRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SourceReliabilityRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get(
        &self,
        platform: Platform,
        author_ref: &str,
    ) -> Result<Option<Model>, RepositoryError> {
        SourceReliability::find_by_id((platform, author_ref.to_string()))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Seeds a never-before-seen author at `seed_accuracy` rather than a
    /// flat neutral prior — callers pass the author's platform's current
    /// `overall` credibility, so a first true-positive verification moves
    /// `ema_accuracy` (and the platform `overall` it feeds back into)
    /// strictly upward instead of dipping through 0.5 first.
    pub async fn get_or_create(
        &self,
        platform: Platform,
        author_ref: &str,
        seed_accuracy: f32,
    ) -> Result<Model, RepositoryError> {
        if let Some(existing) = self.get(platform, author_ref).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let created = ActiveModel {
            platform: Set(platform),
            author_ref: Set(author_ref.to_string()),
            signals_seen: Set(0),
            signals_verified_true: Set(0),
            signals_verified_false: Set(0),
            ema_accuracy: Set(seed_accuracy),
            last_observed_at: Set(now.into()),
        };

        created
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn put(&self, model: Model) -> Result<Model, RepositoryError> {
        let mut active: ActiveModel = model.into_active_model();
        active.last_observed_at = Set(Utc::now().into());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
