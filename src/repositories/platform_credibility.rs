//! # Platform Credibility Repository
//!
//! Get/put access to the single credibility row per platform (C10 contract).

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};

use crate::error::RepositoryError;
use crate::models::platform_credibility::{
    ActiveModel, Entity as PlatformCredibility, Model,
};
use crate::models::signal::Platform;

pub struct PlatformCredibilityRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> PlatformCredibilityRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get(&self, platform: Platform) -> Result<Option<Model>, RepositoryError> {
        PlatformCredibility::find_by_id(platform)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Returns the row for `platform`, seeding it at `seed_overall` (the
    /// per-platform baseline) if no row exists yet.
    pub async fn get_or_seed(
        &self,
        platform: Platform,
        seed_overall: f32,
    ) -> Result<Model, RepositoryError> {
        if let Some(existing) = self.get(platform).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let weight_multiplier = Model::derive_weight_multiplier(seed_overall);
        let seeded = ActiveModel {
            platform: Set(platform),
            overall: Set(seed_overall),
            reliability: Set(seed_overall),
            freshness: Set(seed_overall),
            influence: Set(seed_overall),
            consistency: Set(seed_overall),
            verification: Set(seed_overall),
            weight_multiplier: Set(weight_multiplier),
            sample_size: Set(0),
            updated_at: Set(now.into()),
        };

        seeded
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Persists a full replacement of the credibility row (the engine always
    /// recomputes every dimension together, so a partial update has no
    /// meaning here).
    pub async fn put(&self, model: Model) -> Result<Model, RepositoryError> {
        let mut active: ActiveModel = model.into_active_model();
        active.updated_at = Set(Utc::now().into());
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn list_all(&self) -> Result<Vec<Model>, RepositoryError> {
        PlatformCredibility::find()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn get_or_seed_creates_row_once() {
        let db = test_db().await;
        let repo = PlatformCredibilityRepository::new(&db);

        let first = repo.get_or_seed(Platform::StackOverflow, 0.92).await.unwrap();
        assert_eq!(first.overall, 0.92);
        assert_eq!(first.sample_size, 0);

        let second = repo.get_or_seed(Platform::StackOverflow, 0.10).await.unwrap();
        // Already seeded; seed_overall on a second call must not overwrite it.
        assert_eq!(second.overall, 0.92);
    }

    #[tokio::test]
    async fn put_persists_a_full_replacement() {
        let db = test_db().await;
        let repo = PlatformCredibilityRepository::new(&db);

        let seeded = repo.get_or_seed(Platform::Reddit, 0.77).await.unwrap();
        let mut updated = seeded;
        updated.overall = 0.81;
        updated.sample_size = 12;

        let saved = repo.put(updated).await.unwrap();
        assert_eq!(saved.overall, 0.81);
        assert_eq!(saved.sample_size, 12);
    }
}
