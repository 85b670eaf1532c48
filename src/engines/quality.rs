//! Signal Quality Validator (C2): six-dimension quality score plus an
//! accept/reject gate, grounded on the teacher's `SignalScorer`
//! one-method-per-dimension layout (`signals/weak_engine/scorer.rs`, now
//! retired in favor of this spec-aligned version).

use chrono::{DateTime, Utc};
use metrics::counter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::ToSchema;

use crate::models::platform_credibility::Model as PlatformCredibility;
use crate::models::signal::Signal;
use crate::models::source_reliability::Model as SourceReliability;

use super::lexical::{business_relevance_prototype, cosine_similarity, embed};

/// Composite weights in dimension order: authenticity, freshness, relevance,
/// source_credibility, content_quality, engagement_validity (spec §4.2).
const WEIGHTS: [f32; 6] = [0.20, 0.10, 0.25, 0.20, 0.15, 0.10];

/// Age in hours at which freshness decays to `1/e` (spec §4.2).
const FRESHNESS_TAU_HOURS: f64 = 72.0;

/// A signal only gets `source_reliability` folded into `source_credibility`
/// once its author has this many prior observed signals (spec §4.2).
const RELIABILITY_MIN_PRIOR_SIGNALS: i64 = 5;

static SPAM_PHRASES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)click here",
        r"(?i)check out my",
        r"(?i)limited time offer",
        r"(?i)dm me",
        r"(?i)!!!+",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("static spam pattern compiles"))
    .collect()
});

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("static url pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QualityScore {
    pub authenticity: f32,
    pub freshness: f32,
    pub relevance: f32,
    pub source_credibility: f32,
    pub content_quality: f32,
    pub engagement_validity: f32,
    pub overall: f32,
    pub accepted: bool,
}

#[derive(Debug, Clone)]
pub struct ValidatedSignal {
    pub signal: Signal,
    pub quality: QualityScore,
}

/// A rolling per-platform distribution of engagement totals, used to
/// z-score a signal's engagement realism (spec §4.2 `engagement_validity`).
#[derive(Debug, Clone, Copy, Default)]
pub struct EngagementDistribution {
    pub mean: f64,
    pub stddev: f64,
}

impl EngagementDistribution {
    pub fn from_samples(samples: &[u64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len() as f64;
        let mean = samples.iter().map(|s| *s as f64).sum::<f64>() / n;
        let variance = samples.iter().map(|s| (*s as f64 - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            stddev: variance.sqrt(),
        }
    }

    fn z_score(&self, value: u64) -> f64 {
        if self.stddev < f64::EPSILON {
            return 0.0;
        }
        (value as f64 - self.mean) / self.stddev
    }
}

pub struct QualityValidator {
    threshold: f32,
}

impl QualityValidator {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    fn authenticity(signal: &Signal, reliability: Option<&SourceReliability>) -> f32 {
        let text = format!("{} {}", signal.title, signal.body);
        let word_count = text.split_whitespace().count().max(1) as f32;
        let url_count = URL_PATTERN.find_iter(&text).count() as f32;
        let url_density = (url_count / word_count).min(1.0);

        let spam_hits = SPAM_PHRASES.iter().filter(|pattern| pattern.is_match(&text)).count() as f32;
        let spam_penalty = (spam_hits / SPAM_PHRASES.len() as f32).min(1.0);

        let author_track_record = reliability
            .map(|r| (r.signals_seen as f32 / 20.0).min(1.0))
            .unwrap_or(0.3);

        let engagement_realism = match (signal.engagement.upvotes, signal.engagement.comments) {
            (Some(0), Some(0)) | (None, None) => 0.4,
            _ => 0.8,
        };

        let base = 0.4 * author_track_record + 0.3 * engagement_realism + 0.3 * (1.0 - url_density);
        (base * (1.0 - 0.6 * spam_penalty)).clamp(0.0, 1.0)
    }

    fn freshness(signal: &Signal, now: DateTime<Utc>) -> f32 {
        let age_hours = (now - signal.created_at).num_seconds().max(0) as f64 / 3600.0;
        (-age_hours / FRESHNESS_TAU_HOURS).exp().clamp(0.0, 1.0) as f32
    }

    fn relevance(signal: &Signal) -> f32 {
        let text_embedding = embed(&format!("{} {}", signal.title, signal.body));
        cosine_similarity(&text_embedding, &business_relevance_prototype())
    }

    fn source_credibility(credibility: &PlatformCredibility, reliability: Option<&SourceReliability>) -> f32 {
        match reliability {
            Some(r) if r.signals_seen >= RELIABILITY_MIN_PRIOR_SIGNALS => {
                0.5 * credibility.overall + 0.5 * r.decayed_accuracy(Utc::now())
            }
            _ => credibility.overall,
        }
    }

    fn content_quality(signal: &Signal) -> f32 {
        let text = format!("{} {}", signal.title, signal.body);
        let tokens: Vec<&str> = text.split_whitespace().take(200).collect();
        if tokens.is_empty() {
            return 0.0;
        }
        let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
        let distinct: std::collections::HashSet<&String> = lowered.iter().collect();
        let type_token_ratio = distinct.len() as f32 / lowered.len() as f32;

        let readability_floor = if tokens.len() >= 5 { 1.0 } else { tokens.len() as f32 / 5.0 };
        (type_token_ratio * readability_floor).clamp(0.0, 1.0)
    }

    fn engagement_validity(signal: &Signal, distribution: &EngagementDistribution) -> f32 {
        let has_engagement = signal.engagement.upvotes.is_some()
            || signal.engagement.comments.is_some()
            || signal.engagement.views.is_some();
        if !has_engagement {
            return 0.5;
        }
        let total = signal.engagement.upvotes.unwrap_or(0) + signal.engagement.comments.unwrap_or(0);
        let z = distribution.z_score(total);
        (1.0 / (1.0 + (-z).exp())) as f32
    }

    /// Scores one signal against the current credibility snapshot. Pure:
    /// calling this twice with identical inputs returns an identical score.
    pub fn score(
        &self,
        signal: &Signal,
        credibility: &PlatformCredibility,
        reliability: Option<&SourceReliability>,
        engagement_distribution: &EngagementDistribution,
        now: DateTime<Utc>,
    ) -> QualityScore {
        let dimensions = [
            Self::authenticity(signal, reliability),
            Self::freshness(signal, now),
            Self::relevance(signal),
            Self::source_credibility(credibility, reliability),
            Self::content_quality(signal),
            Self::engagement_validity(signal, engagement_distribution),
        ];

        let overall = dimensions.iter().zip(WEIGHTS.iter()).map(|(d, w)| d * w).sum::<f32>();

        QualityScore {
            authenticity: dimensions[0],
            freshness: dimensions[1],
            relevance: dimensions[2],
            source_credibility: dimensions[3],
            content_quality: dimensions[4],
            engagement_validity: dimensions[5],
            overall,
            accepted: overall >= self.threshold,
        }
    }

    /// Validates a lazy batch; rejections are counted in metrics and
    /// dropped, never raised as errors (spec §4.2 "rejections are counted
    /// in metrics, not raised").
    pub fn validate_batch<'a>(
        &self,
        signals: impl Iterator<Item = Signal> + 'a,
        credibility_for: impl Fn(&Signal) -> PlatformCredibility + 'a,
        reliability_for: impl Fn(&Signal) -> Option<SourceReliability> + 'a,
        engagement_distribution_for: impl Fn(&Signal) -> EngagementDistribution + 'a,
    ) -> Vec<ValidatedSignal> {
        let now = Utc::now();
        let mut accepted = Vec::new();
        for signal in signals {
            counter!("signals_ingested_total").increment(1);
            let credibility = credibility_for(&signal);
            let reliability = reliability_for(&signal);
            let distribution = engagement_distribution_for(&signal);
            let quality = self.score(&signal, &credibility, reliability.as_ref(), &distribution, now);

            if quality.accepted {
                counter!("signals_accepted_total").increment(1);
                accepted.push(ValidatedSignal { signal, quality });
            } else {
                let reason = Self::rejection_reason(&quality);
                counter!("signals_rejected_total", "reason" => reason).increment(1);
            }
        }
        accepted
    }

    fn rejection_reason(quality: &QualityScore) -> &'static str {
        let dims = [
            ("authenticity", quality.authenticity),
            ("freshness", quality.freshness),
            ("relevance", quality.relevance),
            ("source_credibility", quality.source_credibility),
            ("content_quality", quality.content_quality),
            ("engagement_validity", quality.engagement_validity),
        ];
        dims.iter().min_by(|a, b| a.1.partial_cmp(&b.1).unwrap()).map(|(name, _)| *name).unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::signal::{Engagement, Platform};
    use chrono::Duration;
    use uuid::Uuid;

    fn credibility(overall: f32) -> PlatformCredibility {
        PlatformCredibility {
            platform: Platform::Reddit,
            overall,
            reliability: overall,
            freshness: overall,
            influence: overall,
            consistency: overall,
            verification: overall,
            weight_multiplier: PlatformCredibility::derive_weight_multiplier(overall),
            sample_size: 0,
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn spammy_low_effort_signal_is_rejected() {
        let now = Utc::now();
        let signal = Signal::new(
            Uuid::new_v4(),
            Platform::Reddit,
            "u/spammer",
            now,
            now,
            "Check out my new crypto!!!!",
            "Click here https://x.y",
            Engagement { upvotes: Some(0), comments: None, views: None },
            None,
        )
        .unwrap();

        let validator = QualityValidator::new(0.60);
        let score = validator.score(&signal, &credibility(0.77), None, &EngagementDistribution::default(), now);

        assert!(score.authenticity <= 0.3, "authenticity was {}", score.authenticity);
        assert!(score.relevance <= 0.3, "relevance was {}", score.relevance);
        assert!(score.overall < 0.60, "overall was {}", score.overall);
        assert!(!score.accepted);
    }

    #[test]
    fn zero_engagement_signal_can_still_be_accepted() {
        let now = Utc::now();
        let signal = Signal::new(
            Uuid::new_v4(),
            Platform::StackOverflow,
            "author",
            now,
            now,
            "How do I migrate our subscription billing pipeline to a new provider",
            "We run a SaaS product with recurring pricing and need to swap our billing vendor without downtime.",
            Engagement::default(),
            None,
        )
        .unwrap();

        let validator = QualityValidator::new(0.60);
        let score = validator.score(&signal, &credibility(0.92), None, &EngagementDistribution::default(), now);

        assert_eq!(score.engagement_validity, 0.5);
    }

    #[test]
    fn freshness_decays_with_age() {
        let created = Utc::now() - Duration::hours(144);
        let fresh = QualityValidator::freshness(
            &Signal::new(Uuid::new_v4(), Platform::Reddit, "a", Utc::now(), Utc::now(), "t", "b", Engagement::default(), None).unwrap(),
            Utc::now(),
        );
        let stale = QualityValidator::freshness(
            &Signal::new(Uuid::new_v4(), Platform::Reddit, "a", created, created, "t", "b", Engagement::default(), None).unwrap(),
            Utc::now(),
        );
        assert!(fresh > stale);
    }

    #[test]
    fn scoring_is_pure_given_identical_inputs() {
        let now = Utc::now();
        let signal = Signal::new(
            Uuid::new_v4(),
            Platform::GitHub,
            "octocat",
            now,
            now,
            "Feature request: better pricing API",
            "Our team wants a clearer subscription pricing endpoint.",
            Engagement { upvotes: Some(10), comments: Some(3), views: None },
            None,
        )
        .unwrap();
        let validator = QualityValidator::new(0.60);
        let dist = EngagementDistribution::from_samples(&[2, 4, 6, 8, 10]);

        let a = validator.score(&signal, &credibility(0.82), None, &dist, now);
        let b = validator.score(&signal, &credibility(0.82), None, &dist, now);
        assert_eq!(a, b);
    }
}
