//! Pain-Point Detection Engine (C5): a two-stage classifier over a signal's
//! raw text and its C4 [`SemanticScore`], grounded on the same
//! lexical/semantic split the teacher's scorer used for spam detection
//! (`signals/weak_engine/scorer.rs`), now repurposed for pain-point
//! intensity instead of spam probability.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::lexical::max_similarity_against;
use super::semantic::{BusinessContext, DominantEmotion, DominantIntent, SemanticScore};

/// `intensity` threshold above which a signal counts as a detected pain
/// point (spec §4.4).
const DETECTION_THRESHOLD: f32 = 0.35;

const PAIN_LEXICON: &[&str] = &[
    "frustrated", "frustrating", "wish there was", "hate that", "hate it when",
    "wasting time", "waste of time", "sick of", "tired of", "so annoying",
    "doesn't work", "nothing works", "can't find", "too expensive", "too slow",
];

const MODAL_OBLIGATION_CUES: &[&str] = &["need to", "have to", "should be able to", "must be able to", "needs to"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum ProblemType {
    Cost,
    Time,
    Usability,
    Integration,
    Trust,
    Discoverability,
    Performance,
    Compliance,
    Other,
}

impl ProblemType {
    fn exemplars() -> [(ProblemType, &'static str); 8] {
        [
            (ProblemType::Cost, "too expensive pricing subscription fee overpriced budget"),
            (ProblemType::Time, "wasting time slow manual process takes too long tedious"),
            (ProblemType::Usability, "confusing hard to use clunky interface not intuitive"),
            (ProblemType::Integration, "doesn't integrate with no api support connect other tools"),
            (ProblemType::Trust, "security privacy data breach trust reliability outage"),
            (ProblemType::Discoverability, "can't find hard to discover hidden feature documentation missing"),
            (ProblemType::Performance, "slow laggy crashes performance downtime timeout"),
            (ProblemType::Compliance, "compliance regulation audit gdpr soc2 legal requirement"),
        ]
    }

    /// Chooses the taxonomy entry with max similarity against the text;
    /// `Other` is the floor when nothing clears a minimal bar.
    pub fn classify(text: &str) -> ProblemType {
        let (best, score) = Self::exemplars()
            .into_iter()
            .map(|(kind, exemplar)| (kind, max_similarity_against(text, &[exemplar])))
            .fold((ProblemType::Other, 0.0f32), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        if score >= 0.15 { best } else { ProblemType::Other }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Urgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum RevenuePotentialBand {
    Low,
    Med,
    High,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ImplementationComplexity {
    Low,
    Med,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Opportunity {
    pub revenue_potential_band: RevenuePotentialBand,
    pub implementation_complexity: ImplementationComplexity,
    pub validation_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PainPointAssessment {
    pub detected: bool,
    pub intensity: f32,
    pub problem_type: ProblemType,
    pub target_market: String,
    pub urgency: Urgency,
    pub opportunity: Opportunity,
}

/// Small fixed table mapping (business context, problem type) to a revenue
/// band, consulted in priority order; unmatched combinations fall through
/// to `Unknown` (spec §4.4 "a small fixed table").
fn revenue_band_table() -> HashMap<(BusinessContext, ProblemType), RevenuePotentialBand> {
    use BusinessContext::*;
    use ProblemType::*;
    HashMap::from([
        ((Saas, Cost), RevenuePotentialBand::High),
        ((Saas, Integration), RevenuePotentialBand::High),
        ((Fintech, Trust), RevenuePotentialBand::High),
        ((Fintech, Compliance), RevenuePotentialBand::High),
        ((DevTools, Integration), RevenuePotentialBand::Med),
        ((DevTools, Performance), RevenuePotentialBand::Med),
        ((Productivity, Time), RevenuePotentialBand::Med),
        ((Productivity, Usability), RevenuePotentialBand::Low),
        ((Ecommerce, Discoverability), RevenuePotentialBand::Med),
        ((Marketplace, Trust), RevenuePotentialBand::Med),
    ])
}

fn implementation_complexity_table() -> HashMap<ProblemType, ImplementationComplexity> {
    HashMap::from([
        (ProblemType::Cost, ImplementationComplexity::Low),
        (ProblemType::Time, ImplementationComplexity::Med),
        (ProblemType::Usability, ImplementationComplexity::Med),
        (ProblemType::Integration, ImplementationComplexity::High),
        (ProblemType::Trust, ImplementationComplexity::High),
        (ProblemType::Discoverability, ImplementationComplexity::Low),
        (ProblemType::Performance, ImplementationComplexity::High),
        (ProblemType::Compliance, ImplementationComplexity::High),
        (ProblemType::Other, ImplementationComplexity::Med),
    ])
}

pub struct PainPointDetector;

impl PainPointDetector {
    /// Stage A: lexical/structural score in `[0,1]` from pain-lexicon hits,
    /// question-mark density, and modal-obligation cues (spec §4.4 Stage A).
    fn lexical_score(text: &str) -> f32 {
        let lowered = text.to_lowercase();
        let lexicon_hits = PAIN_LEXICON.iter().filter(|p| lowered.contains(*p)).count() as f32;
        // A single strong lexicon phrase already reads as a clear pain signal
        // (spec §4.4 scenario 2); two or more saturates the component.
        let lexicon_component = (lexicon_hits / 1.2).min(1.0);

        let word_count = text.split_whitespace().count().max(1) as f32;
        let question_marks = text.matches('?').count() as f32;
        let question_density = (question_marks / word_count * 10.0).min(1.0);

        let modal_hits = MODAL_OBLIGATION_CUES.iter().filter(|c| lowered.contains(*c)).count() as f32;
        let modal_component = (modal_hits / 2.0).min(1.0);

        (0.6 * lexicon_component + 0.2 * question_density + 0.2 * modal_component).clamp(0.0, 1.0)
    }

    /// Stage B: semantic score derived from C4's classification — a
    /// complaint/request/question intent with sufficiently strong negative
    /// sentiment reads as a pain signal (spec §4.4 Stage B).
    fn semantic_score(semantic: &SemanticScore) -> f32 {
        let intent_matches = matches!(
            semantic.dominant_intent,
            DominantIntent::Complaint | DominantIntent::Request | DominantIntent::Question
        );
        let negative_polarity = matches!(
            semantic.dominant_emotion,
            DominantEmotion::Anger | DominantEmotion::Frustration | DominantEmotion::Sadness
        );

        if intent_matches && negative_polarity && semantic.sentiment_strength >= 0.4 {
            semantic.sentiment_strength
        } else if intent_matches {
            semantic.sentiment_strength * 0.5
        } else {
            0.0
        }
    }

    fn urgency_for(intensity: f32) -> Urgency {
        if intensity >= 0.70 {
            Urgency::High
        } else if intensity >= 0.45 {
            Urgency::Medium
        } else {
            Urgency::Low
        }
    }

    fn target_market(semantic: &SemanticScore) -> String {
        semantic
            .business_contexts
            .first()
            .map(|ctx| format!("{ctx:?}").to_lowercase())
            .unwrap_or_else(|| "general".to_string())
    }

    /// Assesses a pain point from `text` and its already-computed semantic
    /// score, folding in the source's credibility weight for the
    /// opportunity's validation score. Deterministic and side-effect-free
    /// (spec §4.4 "side-effect-free and deterministic").
    pub fn assess(text: &str, semantic: &SemanticScore, source_credibility: f32) -> PainPointAssessment {
        let lex = Self::lexical_score(text);
        let sem = Self::semantic_score(semantic);
        let intensity = 0.5 * lex + 0.5 * sem;
        let detected = intensity >= DETECTION_THRESHOLD;

        let problem_type = ProblemType::classify(text);
        let validation_score =
            (0.4 * intensity + 0.3 * semantic.innovation_potential + 0.3 * source_credibility).clamp(0.0, 1.0);

        let revenue_band = semantic
            .business_contexts
            .iter()
            .find_map(|ctx| revenue_band_table().get(&(ctx.clone(), problem_type)).copied())
            .unwrap_or(RevenuePotentialBand::Unknown);

        let implementation_complexity = implementation_complexity_table()
            .get(&problem_type)
            .copied()
            .unwrap_or(ImplementationComplexity::Med);

        PainPointAssessment {
            detected,
            intensity,
            problem_type,
            target_market: Self::target_market(semantic),
            urgency: Self::urgency_for(intensity),
            opportunity: Opportunity {
                revenue_potential_band: revenue_band,
                implementation_complexity,
                validation_score,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::semantic::Confidence;

    fn semantic_for(intent: DominantIntent, emotion: DominantEmotion, strength: f32, contexts: Vec<BusinessContext>) -> SemanticScore {
        SemanticScore {
            context_relevance: 0.7,
            intent_clarity: 0.8,
            sentiment_strength: strength,
            entity_richness: 0.5,
            semantic_coherence: 0.8,
            innovation_potential: 0.3,
            dominant_intent: intent,
            dominant_emotion: emotion,
            business_contexts: contexts,
            key_concepts: vec!["pricing".to_string()],
            confidence: Confidence::High,
        }
    }

    #[test]
    fn pricing_complaint_is_detected_as_a_cost_pain_point() {
        let semantic = semantic_for(
            DominantIntent::Request,
            DominantEmotion::Frustration,
            0.7,
            vec![BusinessContext::Saas],
        );
        let assessment = PainPointDetector::assess(
            "Wish there was a cheaper Mixpanel alternative. Paying $400/mo is killing our startup",
            &semantic,
            0.77,
        );

        assert!(assessment.detected);
        assert!(assessment.intensity >= 0.55, "intensity was {}", assessment.intensity);
        assert_eq!(assessment.problem_type, ProblemType::Cost);
    }

    #[test]
    fn neutral_announcement_is_not_a_pain_point() {
        let semantic = semantic_for(DominantIntent::Announcement, DominantEmotion::Joy, 0.6, vec![]);
        let assessment = PainPointDetector::assess("We just shipped a new dashboard for everyone", &semantic, 0.8);
        assert!(!assessment.detected);
    }

    #[test]
    fn high_intensity_maps_to_high_urgency() {
        assert_eq!(PainPointDetector::urgency_for(0.8), Urgency::High);
        assert_eq!(PainPointDetector::urgency_for(0.5), Urgency::Medium);
        assert_eq!(PainPointDetector::urgency_for(0.1), Urgency::Low);
    }
}
