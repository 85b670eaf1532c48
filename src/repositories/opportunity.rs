//! # Opportunity History Repository
//!
//! Append-by-content-id persistence for C8's output (C10 contract).
//! Regenerating an opportunity for the same cluster overwrites the row for
//! its content-derived `opportunity_id` rather than inserting a duplicate
//! (spec §5 "same `opportunity_id` deduplicates on conflict").

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::opportunity::{ActiveModel, Column, Entity as Opportunity, Model};

pub struct OpportunityRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> OpportunityRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Upserts a batch of opportunities, keyed by `opportunity_id`. Matches
    /// the fusion orchestrator's idempotent-regeneration contract: the same
    /// cluster content always produces the same id and overwrites in place.
    pub async fn save_batch(&self, opportunities: Vec<Model>) -> Result<(), RepositoryError> {
        if opportunities.is_empty() {
            return Ok(());
        }
        let actives: Vec<ActiveModel> = opportunities
            .into_iter()
            .map(|mut model| {
                model.generated_at = Utc::now().into();
                model.into_active_model()
            })
            .collect();

        Opportunity::insert_many(actives)
            .on_conflict(
                OnConflict::column(Column::OpportunityId)
                    .update_columns([
                        Column::Title,
                        Column::Summary,
                        Column::ClusterRef,
                        Column::CompositeScore,
                        Column::ComponentSemantic,
                        Column::ComponentTemporalMomentum,
                        Column::ComponentInnovation,
                        Column::ComponentEmergenceProbability,
                        Column::ComponentCredibility,
                        Column::ComponentPainIntensity,
                        Column::MarketTiming,
                        Column::RiskFactors,
                        Column::SupportingSignals,
                        Column::GeneratedAt,
                    ])
                    .to_owned(),
            )
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    pub async fn get(&self, opportunity_id: Uuid) -> Result<Option<Model>, RepositoryError> {
        Opportunity::find_by_id(opportunity_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn recent(&self, limit: u64) -> Result<Vec<Model>, RepositoryError> {
        Opportunity::find()
            .order_by_desc(Column::GeneratedAt)
            .limit(limit)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
