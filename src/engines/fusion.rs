//! Multi-Modal Fusion Engine (C8): combines a cluster's C3/C4/C5/C6 outputs
//! into a ranked, scored [`Opportunity`] row, grounded on the same
//! weighted-dimension-struct pattern as C2's quality scorer
//! (`engines::quality`) but composing across engines instead of within one.

use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use uuid::Uuid;

use super::clustering::Cluster;
use super::pain_point::ProblemType;
use super::temporal::{PatternTag, TemporalPattern, TrendDirection};
use crate::models::opportunity::{MarketTiming, Model as OpportunityModel, OpportunityComponents};

/// `temporal_momentum` = `max(strength)` over the trend and emergence
/// patterns, with no confidence weighting (spec §4.7 "temporal_momentum =
/// max(TemporalPattern.strength for tag ∈ {trend, emergence})").
pub fn temporal_momentum(patterns: &[TemporalPattern]) -> f32 {
    patterns
        .iter()
        .filter(|p| matches!(p.tag, PatternTag::Trend | PatternTag::Emergence))
        .map(|p| p.strength)
        .fold(0.0f32, f32::max)
        .clamp(0.0, 1.0)
}

/// Derives emergence probability the same way, from the emergence pattern.
pub fn emergence_probability(patterns: &[TemporalPattern]) -> f32 {
    patterns
        .iter()
        .find(|p| p.tag == PatternTag::Emergence)
        .map(|p| p.strength * p.confidence)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0)
}

/// Everything the fusion stage needs for one cluster, already resolved by
/// the pipeline from C3 (credibility), C4 (semantic averages), C5 (pain
/// intensity), and C6 (temporal patterns) — fusion itself stays pure and
/// side-effect-free, matching the rest of the engines (spec §4.7).
#[derive(Debug, Clone)]
pub struct ClusterFusionInput {
    pub cluster: Cluster,
    pub semantic_relevance: f32,
    pub innovation_potential: f32,
    pub credibility: f32,
    pub temporal_patterns: Vec<TemporalPattern>,
}

fn problem_type_label(problem_type: ProblemType) -> &'static str {
    match problem_type {
        ProblemType::Cost => "cost",
        ProblemType::Time => "time",
        ProblemType::Usability => "usability",
        ProblemType::Integration => "integration",
        ProblemType::Trust => "trust",
        ProblemType::Discoverability => "discoverability",
        ProblemType::Performance => "performance",
        ProblemType::Compliance => "compliance",
        ProblemType::Other => "general",
    }
}

pub struct FusionEngine;

impl FusionEngine {
    pub fn components(input: &ClusterFusionInput) -> OpportunityComponents {
        OpportunityComponents {
            semantic: input.semantic_relevance,
            temporal_momentum: temporal_momentum(&input.temporal_patterns),
            innovation: input.innovation_potential,
            emergence_probability: emergence_probability(&input.temporal_patterns),
            credibility: input.credibility,
            pain_intensity: input.cluster.average_intensity,
        }
    }

    /// Maps temporal momentum/emergence into the five-valued market-timing
    /// lifecycle (DESIGN.md Open Question 3), the literal mapping from spec
    /// §4.8: `too_early` when both emergence and momentum are negligible;
    /// `past` when the anomaly pattern dominates the others and the trend is
    /// declining; `now` when momentum and emergence are both strong;
    /// `early`/`late` otherwise split on whether momentum is still building
    /// or already fading.
    pub fn market_timing(components: &OpportunityComponents, patterns: &[TemporalPattern]) -> MarketTiming {
        let momentum = components.temporal_momentum;
        let emergence = components.emergence_probability;

        let anomaly = patterns.iter().find(|p| p.tag == PatternTag::Anomaly);
        let trend = patterns.iter().find(|p| p.tag == PatternTag::Trend);
        let strongest_non_anomaly = patterns
            .iter()
            .filter(|p| p.tag != PatternTag::Anomaly)
            .map(|p| p.strength)
            .fold(0.0f32, f32::max);
        let anomaly_dominates = anomaly.is_some_and(|a| a.strength > strongest_non_anomaly);
        let trend_is_falling = trend.is_some_and(|t| t.direction == TrendDirection::Falling);

        if emergence < 0.2 && momentum < 0.2 {
            MarketTiming::TooEarly
        } else if anomaly_dominates && trend_is_falling {
            MarketTiming::Past
        } else if momentum >= 0.5 && emergence >= 0.4 {
            MarketTiming::Now
        } else if momentum >= 0.2 {
            MarketTiming::Early
        } else {
            MarketTiming::Late
        }
    }

    pub fn risk_factors(input: &ClusterFusionInput, components: &OpportunityComponents) -> Vec<String> {
        let mut risks = Vec::new();
        if input.cluster.platforms_covered.len() == 1 {
            risks.push("validated on a single platform only".to_string());
        }
        if !input.cluster.tight_temporal_alignment {
            risks.push("signals span a wide time range with weak temporal correlation".to_string());
        }
        if components.credibility < 0.5 {
            risks.push("low average source credibility".to_string());
        }
        if input.cluster.member_signal_ids.len() < 3 {
            risks.push("small sample size".to_string());
        }
        if components.pain_intensity < 0.45 {
            risks.push("pain intensity below strong-signal threshold".to_string());
        }
        risks
    }

    fn title_and_summary(input: &ClusterFusionInput) -> (String, String) {
        let label = problem_type_label(input.cluster.dominant_problem_type);
        let platform_count = input.cluster.platforms_covered.len();
        let title = format!(
            "{} pain point across {} platform{}",
            label,
            platform_count,
            if platform_count == 1 { "" } else { "s" }
        );
        let summary = format!(
            "{} signals discussing a {} problem; {}.",
            input.cluster.member_signal_ids.len(),
            label,
            if input.cluster.universal {
                "corroborated across three or more distinct platforms"
            } else {
                "observed on a limited set of platforms"
            }
        );
        (title, summary)
    }

    /// Builds the persistable [`OpportunityModel`] for one cluster. The id
    /// is derived from `cluster_id` (itself content-derived, see
    /// `engines::clustering`) so regenerating an unchanged cluster always
    /// produces the same row rather than a new history entry.
    pub fn fuse(input: ClusterFusionInput) -> OpportunityModel {
        let components = Self::components(&input);
        let composite_score = components.composite_score();
        let market_timing = Self::market_timing(&components, &input.temporal_patterns);
        let risk_factors = Self::risk_factors(&input, &components);
        let (title, summary) = Self::title_and_summary(&input);
        let opportunity_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, input.cluster.cluster_id.as_bytes());
        let supporting_signals = input.cluster.member_signal_ids.clone();

        OpportunityModel {
            opportunity_id,
            title,
            summary,
            cluster_ref: input.cluster.cluster_id.clone(),
            composite_score,
            component_semantic: components.semantic,
            component_temporal_momentum: components.temporal_momentum,
            component_innovation: components.innovation,
            component_emergence_probability: components.emergence_probability,
            component_credibility: components.credibility,
            component_pain_intensity: components.pain_intensity,
            market_timing,
            risk_factors: serde_json::to_value(&risk_factors).unwrap_or_default(),
            supporting_signals: serde_json::to_value(&supporting_signals).unwrap_or_default(),
            generated_at: Utc::now().into(),
        }
    }

    /// Fuses every cluster and returns the top `k` opportunities by
    /// composite score, descending (spec §4.7 "top-K ranking").
    pub fn fuse_and_rank(inputs: Vec<ClusterFusionInput>, k: usize) -> Vec<OpportunityModel> {
        let started = Instant::now();
        let mut opportunities: Vec<OpportunityModel> = inputs.into_iter().map(Self::fuse).collect();
        opportunities.sort_by(|a, b| b.composite_score.partial_cmp(&a.composite_score).unwrap());
        opportunities.truncate(k);
        histogram!("fusion_latency_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        counter!("opportunities_emitted_total").increment(opportunities.len() as u64);
        opportunities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::signal::Platform;
    use uuid::Uuid as UuidT;

    fn cluster(platforms: Vec<Platform>, intensity: f32, tight: bool) -> Cluster {
        Cluster {
            cluster_id: "abc123".to_string(),
            member_signal_ids: platforms.iter().map(|_| UuidT::new_v4()).collect(),
            universal: platforms.len() >= 3,
            platforms_covered: platforms,
            dominant_problem_type: ProblemType::Cost,
            correlation_type: Some(super::super::clustering::CorrelationType::Similar),
            tight_temporal_alignment: tight,
            average_intensity: intensity,
        }
    }

    fn trend(strength: f32, confidence: f32) -> TemporalPattern {
        trend_with_direction(strength, confidence, TrendDirection::Flat)
    }

    fn trend_with_direction(strength: f32, confidence: f32, direction: TrendDirection) -> TemporalPattern {
        TemporalPattern {
            tag: PatternTag::Trend,
            strength,
            confidence,
            forecast: None,
            direction,
        }
    }

    fn emergence(strength: f32, confidence: f32) -> TemporalPattern {
        TemporalPattern {
            tag: PatternTag::Emergence,
            strength,
            confidence,
            forecast: None,
            direction: TrendDirection::Flat,
        }
    }

    fn anomaly(strength: f32, confidence: f32) -> TemporalPattern {
        TemporalPattern {
            tag: PatternTag::Anomaly,
            strength,
            confidence,
            forecast: None,
            direction: TrendDirection::Flat,
        }
    }

    #[test]
    fn strong_momentum_and_emergence_maps_to_now() {
        let components = OpportunityComponents {
            semantic: 0.6,
            temporal_momentum: 0.8,
            innovation: 0.4,
            emergence_probability: 0.5,
            credibility: 0.7,
            pain_intensity: 0.6,
        };
        assert_eq!(FusionEngine::market_timing(&components, &[]), MarketTiming::Now);
    }

    #[test]
    fn negligible_momentum_and_emergence_is_too_early() {
        let components = OpportunityComponents {
            semantic: 0.6,
            temporal_momentum: 0.1,
            innovation: 0.4,
            emergence_probability: 0.1,
            credibility: 0.7,
            pain_intensity: 0.6,
        };
        assert_eq!(FusionEngine::market_timing(&components, &[]), MarketTiming::TooEarly);
    }

    #[test]
    fn anomaly_dominant_with_falling_trend_is_past() {
        let components = OpportunityComponents {
            semantic: 0.6,
            temporal_momentum: 0.3,
            innovation: 0.4,
            emergence_probability: 0.2,
            credibility: 0.7,
            pain_intensity: 0.6,
        };
        let patterns = vec![trend_with_direction(0.3, 0.5, TrendDirection::Falling), anomaly(0.9, 0.8)];
        assert_eq!(FusionEngine::market_timing(&components, &patterns), MarketTiming::Past);
    }

    #[test]
    fn anomaly_dominant_with_rising_trend_is_not_past() {
        let components = OpportunityComponents {
            semantic: 0.6,
            temporal_momentum: 0.3,
            innovation: 0.4,
            emergence_probability: 0.2,
            credibility: 0.7,
            pain_intensity: 0.6,
        };
        let patterns = vec![trend_with_direction(0.3, 0.5, TrendDirection::Rising), anomaly(0.9, 0.8)];
        assert_ne!(FusionEngine::market_timing(&components, &patterns), MarketTiming::Past);
    }

    #[test]
    fn single_platform_low_credibility_cluster_collects_multiple_risk_factors() {
        let input = ClusterFusionInput {
            cluster: cluster(vec![Platform::Reddit], 0.3, false),
            semantic_relevance: 0.5,
            innovation_potential: 0.3,
            credibility: 0.4,
            temporal_patterns: vec![trend(0.2, 0.5), emergence(0.1, 0.3)],
        };
        let components = FusionEngine::components(&input);
        let risks = FusionEngine::risk_factors(&input, &components);
        assert!(risks.iter().any(|r| r.contains("single platform")));
        assert!(risks.iter().any(|r| r.contains("credibility")));
        assert!(risks.iter().any(|r| r.contains("temporal")));
    }

    #[test]
    fn fuse_and_rank_orders_by_composite_score_descending() {
        let strong = ClusterFusionInput {
            cluster: cluster(vec![Platform::Reddit, Platform::HackerNews, Platform::Twitter], 0.8, true),
            semantic_relevance: 0.8,
            innovation_potential: 0.6,
            credibility: 0.9,
            temporal_patterns: vec![trend(0.8, 0.9)],
        };
        let weak = ClusterFusionInput {
            cluster: cluster(vec![Platform::Reddit], 0.2, false),
            semantic_relevance: 0.2,
            innovation_potential: 0.1,
            credibility: 0.3,
            temporal_patterns: vec![],
        };
        let ranked = FusionEngine::fuse_and_rank(vec![weak, strong], 2);
        assert!(ranked[0].composite_score >= ranked[1].composite_score);
    }

    #[test]
    fn opportunity_id_is_derived_from_cluster_id_and_stable() {
        let input = ClusterFusionInput {
            cluster: cluster(vec![Platform::Reddit], 0.5, true),
            semantic_relevance: 0.5,
            innovation_potential: 0.3,
            credibility: 0.6,
            temporal_patterns: vec![],
        };
        let a = FusionEngine::fuse(input.clone());
        let b = FusionEngine::fuse(input);
        assert_eq!(a.opportunity_id, b.opportunity_id);
    }
}
