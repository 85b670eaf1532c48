//! Source (author, per-platform) reliability entity (C3).
//!
//! Keyed by `(platform, author_ref)`. Tracks how often a given author's
//! signals have verified true versus false, and an EMA of accuracy derived
//! from that history.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::signal::Platform;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "source_reliability")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub platform: Platform,
    #[sea_orm(primary_key, auto_increment = false)]
    pub author_ref: String,
    pub signals_seen: i64,
    pub signals_verified_true: i64,
    pub signals_verified_false: i64,
    pub ema_accuracy: f32,
    pub last_observed_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Half-life used when decaying a stale reliability estimate back toward the
/// neutral prior of 0.5 (see `DESIGN.md`, Open Question 2).
pub const DECAY_HALF_LIFE_DAYS: f64 = 90.0;

impl Model {
    /// Returns `ema_accuracy` decayed toward the neutral prior (0.5) by
    /// elapsed time since `last_observed_at`, read-time only — no background
    /// job mutates the stored value.
    pub fn decayed_accuracy(&self, now: chrono::DateTime<chrono::Utc>) -> f32 {
        let elapsed_days = (now - self.last_observed_at.with_timezone(&chrono::Utc))
            .num_seconds()
            .max(0) as f64
            / 86_400.0;
        let decay = 0.5f64.powf(elapsed_days / DECAY_HALF_LIFE_DAYS);
        let prior = 0.5f64;
        (prior + (self.ema_accuracy as f64 - prior) * decay) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn row(accuracy: f32, observed_at: chrono::DateTime<chrono::Utc>) -> Model {
        Model {
            platform: Platform::Reddit,
            author_ref: "u/test".to_string(),
            signals_seen: 10,
            signals_verified_true: 8,
            signals_verified_false: 2,
            ema_accuracy: accuracy,
            last_observed_at: observed_at.into(),
        }
    }

    #[test]
    fn decay_is_identity_at_zero_elapsed_time() {
        let now = chrono::Utc::now();
        let m = row(0.9, now);
        assert!((m.decayed_accuracy(now) - 0.9).abs() < 1e-4);
    }

    #[test]
    fn decay_halves_the_distance_from_prior_after_one_half_life() {
        let now = chrono::Utc::now();
        let observed = now - Duration::days(90);
        let m = row(0.9, observed);
        let decayed = m.decayed_accuracy(now);
        // distance from 0.5 should have halved: 0.4 -> 0.2
        assert!((decayed - 0.7).abs() < 0.01);
    }
}
