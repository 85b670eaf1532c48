//! Signal verification entity (C3) — append-only.
//!
//! Each row records the outcome of checking a predicted pain assessment
//! against what actually happened. Rows are never updated or deleted once
//! inserted; the primary key `(signal_id, verified_at)` allows a signal to
//! be re-verified over time without overwriting history.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::signal::Platform;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "signal_verification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub signal_id: Uuid,
    pub platform: Platform,
    pub predicted_pain: bool,
    pub predicted_intensity: f32,
    pub verified_pain: bool,
    #[sea_orm(primary_key, auto_increment = false)]
    pub verified_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the prediction matched the verified outcome.
    pub fn was_correct(&self) -> bool {
        self.predicted_pain == self.verified_pain
    }
}
