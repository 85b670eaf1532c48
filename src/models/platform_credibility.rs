//! Platform credibility entity (C3).
//!
//! One row per platform, updated via exponential moving averages as
//! verification outcomes arrive. `platform` is the primary key: there is
//! exactly one credibility profile per platform, seeded at warm start.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::signal::Platform;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "platform_credibility")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub platform: Platform,
    pub overall: f32,
    pub reliability: f32,
    pub freshness: f32,
    pub influence: f32,
    pub consistency: f32,
    pub verification: f32,
    pub weight_multiplier: f32,
    pub sample_size: i64,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// `weight_multiplier` is always derived from `overall`, never stored
    /// independently of it: 0.1 + 1.9 * overall, clamped to [0.1, 2.0].
    pub fn derive_weight_multiplier(overall: f32) -> f32 {
        (0.1 + 1.9 * overall).clamp(0.1, 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_multiplier_spans_the_documented_range() {
        assert_eq!(Model::derive_weight_multiplier(0.0), 0.1);
        assert_eq!(Model::derive_weight_multiplier(1.0), 2.0);
        let mid = Model::derive_weight_multiplier(0.5);
        assert!((mid - 1.05).abs() < 1e-6);
    }
}
