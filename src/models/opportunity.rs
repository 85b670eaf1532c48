//! Opportunity entity (C8 output, C10 persistence).
//!
//! An opportunity is the fused, ranked output of the pipeline: a scored,
//! clustered, market-timed recommendation derived from one or more signals.
//! History is append-only by `opportunity_id`; regenerating the same
//! cluster's opportunity is idempotent and overwrites the prior row for that
//! id rather than creating a duplicate.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a cluster sits in its market-adoption lifecycle (C8 fusion output).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum MarketTiming {
    #[sea_orm(string_value = "too_early")]
    #[serde(rename = "too_early")]
    TooEarly,
    #[sea_orm(string_value = "early")]
    #[serde(rename = "early")]
    Early,
    #[sea_orm(string_value = "now")]
    #[serde(rename = "now")]
    Now,
    #[sea_orm(string_value = "late")]
    #[serde(rename = "late")]
    Late,
    #[sea_orm(string_value = "past")]
    #[serde(rename = "past")]
    Past,
}

/// The weighted components that sum to `composite_score` (C8 fusion).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OpportunityComponents {
    pub semantic: f32,
    pub temporal_momentum: f32,
    pub innovation: f32,
    pub emergence_probability: f32,
    pub credibility: f32,
    pub pain_intensity: f32,
}

impl OpportunityComponents {
    /// composite_score = 0.25*credibility + 0.20*pain_intensity +
    /// 0.20*temporal_momentum + 0.15*semantic + 0.10*emergence_probability +
    /// 0.10*innovation
    pub fn composite_score(&self) -> f32 {
        0.25 * self.credibility
            + 0.20 * self.pain_intensity
            + 0.20 * self.temporal_momentum
            + 0.15 * self.semantic
            + 0.10 * self.emergence_probability
            + 0.10 * self.innovation
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "opportunity_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub opportunity_id: Uuid,
    pub title: String,
    pub summary: String,
    pub cluster_ref: String,
    pub composite_score: f32,
    pub component_semantic: f32,
    pub component_temporal_momentum: f32,
    pub component_innovation: f32,
    pub component_emergence_probability: f32,
    pub component_credibility: f32,
    pub component_pain_intensity: f32,
    pub market_timing: MarketTiming,
    #[sea_orm(column_type = "JsonBinary")]
    pub risk_factors: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub supporting_signals: Json,
    pub generated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// API/conversation-facing representation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OpportunityResponse {
    pub opportunity_id: Uuid,
    pub title: String,
    pub summary: String,
    pub cluster_ref: String,
    pub composite_score: f32,
    pub components: OpportunityComponents,
    pub market_timing: MarketTiming,
    pub risk_factors: Vec<String>,
    pub supporting_signals: Vec<Uuid>,
    #[schema(value_type = String, example = "2026-01-01T12:00:00Z")]
    pub generated_at: DateTimeWithTimeZone,
}

impl From<Model> for OpportunityResponse {
    fn from(model: Model) -> Self {
        Self {
            opportunity_id: model.opportunity_id,
            title: model.title,
            summary: model.summary,
            cluster_ref: model.cluster_ref,
            composite_score: model.composite_score,
            components: OpportunityComponents {
                semantic: model.component_semantic,
                temporal_momentum: model.component_temporal_momentum,
                innovation: model.component_innovation,
                emergence_probability: model.component_emergence_probability,
                credibility: model.component_credibility,
                pain_intensity: model.component_pain_intensity,
            },
            market_timing: model.market_timing,
            risk_factors: serde_json::from_value(model.risk_factors).unwrap_or_default(),
            supporting_signals: serde_json::from_value(model.supporting_signals)
                .unwrap_or_default(),
            generated_at: model.generated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_score_weights_sum_to_one() {
        let equal = OpportunityComponents {
            semantic: 1.0,
            temporal_momentum: 1.0,
            innovation: 1.0,
            emergence_probability: 1.0,
            credibility: 1.0,
            pain_intensity: 1.0,
        };
        assert!((equal.composite_score() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn credibility_dominates_the_composite_score() {
        let credibility_only = OpportunityComponents {
            semantic: 0.0,
            temporal_momentum: 0.0,
            innovation: 0.0,
            emergence_probability: 0.0,
            credibility: 1.0,
            pain_intensity: 0.0,
        };
        assert!((credibility_only.composite_score() - 0.25).abs() < 1e-6);
    }
}
