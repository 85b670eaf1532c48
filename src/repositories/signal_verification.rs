//! # Signal Verification Repository
//!
//! Append-only log of verification outcomes (C10 contract). Rows are never
//! updated; `(signal_id, verified_at)` lets a signal be re-verified over
//! time without overwriting history.

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::signal_verification::{ActiveModel, Entity as SignalVerification, Model};

pub struct SignalVerificationRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SignalVerificationRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn append(&self, record: Model) -> Result<Model, RepositoryError> {
        let active: ActiveModel = record.into_active_model();
        active.insert(self.db).await.map_err(RepositoryError::database_error)
    }

    pub async fn history_for(&self, signal_id: Uuid, limit: u64) -> Result<Vec<Model>, RepositoryError> {
        SignalVerification::find()
            .filter(crate::models::signal_verification::Column::SignalId.eq(signal_id))
            .order_by_desc(crate::models::signal_verification::Column::VerifiedAt)
            .limit(limit)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}
