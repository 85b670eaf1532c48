//! Semantic Analysis Engine (C4): NLP scoring of a text across six
//! dimensions, parameterized over a pluggable [`ModelProvider`] capability,
//! grounded on the teacher's `Connector` capability-trait pattern
//! generalized from provider sync to model inference.

use std::collections::HashSet;

use std::time::Instant;

use async_trait::async_trait;
use metrics::histogram;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::lexical::{cosine_similarity, embed, max_similarity_against};

/// Confidence flag surfaced whenever the lexical fallback stood in for a
/// real model provider (spec §4.3 "flagged" confidence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DominantIntent {
    Question,
    Complaint,
    Request,
    Announcement,
    Opinion,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DominantEmotion {
    Joy,
    Anger,
    Frustration,
    Sadness,
    Surprise,
    Neutral,
}

/// Closed set of the spec's named business contexts plus an open-ended
/// catch-all (DESIGN.md Open Question 1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum BusinessContext {
    Saas,
    Fintech,
    DevTools,
    Productivity,
    Ecommerce,
    Healthtech,
    Edtech,
    Marketplace,
    Other(String),
}

impl BusinessContext {
    fn exemplars() -> [(BusinessContext, &'static str); 8] {
        [
            (BusinessContext::Saas, "subscription software product pricing plan customers churn"),
            (BusinessContext::Fintech, "payments banking invoicing taxes ledger money transfer"),
            (BusinessContext::DevTools, "api sdk compiler build pipeline ci cd developer tooling"),
            (BusinessContext::Productivity, "task management calendar notes scheduling workflow"),
            (BusinessContext::Ecommerce, "storefront checkout inventory shipping orders marketplace listing"),
            (BusinessContext::Healthtech, "patient clinic appointment medical records health"),
            (BusinessContext::Edtech, "students courses curriculum learning classroom teacher"),
            (BusinessContext::Marketplace, "buyers sellers listings commission marketplace platform"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SemanticScore {
    pub context_relevance: f32,
    pub intent_clarity: f32,
    pub sentiment_strength: f32,
    pub entity_richness: f32,
    pub semantic_coherence: f32,
    pub innovation_potential: f32,
    pub dominant_intent: DominantIntent,
    pub dominant_emotion: DominantEmotion,
    pub business_contexts: Vec<BusinessContext>,
    pub key_concepts: Vec<String>,
    pub confidence: Confidence,
}

/// Capability every model-backed or heuristic provider implements (spec
/// §4.3/§6 "Model Provider contract").
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Vec<f32>;
    async fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await);
        }
        out
    }
    async fn classify_intent(&self, text: &str) -> (DominantIntent, f32);
    async fn classify_emotion(&self, text: &str) -> (DominantEmotion, f32);
    async fn extract_entities(&self, text: &str) -> Vec<(String, f32)>;
    fn is_fallback(&self) -> bool {
        false
    }
}

const NOVELTY_LEXICON: &[&str] = &[
    "first", "new way", "alternative to", "never seen before", "reinvent", "rethink", "unlike anything",
];

const INTENT_QUESTION_CUES: &[&str] = &["?", "how do i", "what is", "anyone know", "does anyone"];
const INTENT_COMPLAINT_CUES: &[&str] = &["hate that", "frustrated", "annoying", "broken", "worst"];
const INTENT_REQUEST_CUES: &[&str] = &["wish there was", "please add", "would love", "feature request"];
const INTENT_ANNOUNCEMENT_CUES: &[&str] = &["launching", "we just shipped", "introducing", "announcing"];

const POSITIVE_LEXICON: &[&str] = &["great", "love", "excellent", "awesome", "amazing", "happy"];
const NEGATIVE_LEXICON: &[&str] = &["hate", "terrible", "frustrated", "awful", "annoying", "angry", "wasting"];

const BUSINESS_ENTITY_WEIGHTS: &[(&str, f32)] = &[
    ("stripe", 1.5), ("aws", 1.5), ("salesforce", 1.5), ("slack", 1.3), ("github", 1.3),
    ("saas", 1.2), ("startup", 1.1), ("api", 1.1),
];

/// Lexical-heuristic fallback, always available so C4 degrades gracefully
/// when no neural model provider is configured (spec §7 `ModelUnavailable`).
pub struct LexicalFallbackProvider;

#[async_trait]
impl ModelProvider for LexicalFallbackProvider {
    async fn embed(&self, text: &str) -> Vec<f32> {
        embed(text).to_vec()
    }

    async fn classify_intent(&self, text: &str) -> (DominantIntent, f32) {
        let lowered = text.to_lowercase();
        let scored = [
            (DominantIntent::Question, count_hits(&lowered, INTENT_QUESTION_CUES)),
            (DominantIntent::Complaint, count_hits(&lowered, INTENT_COMPLAINT_CUES)),
            (DominantIntent::Request, count_hits(&lowered, INTENT_REQUEST_CUES)),
            (DominantIntent::Announcement, count_hits(&lowered, INTENT_ANNOUNCEMENT_CUES)),
        ];
        let (intent, hits) = scored.into_iter().max_by_key(|(_, hits)| *hits).unwrap_or((DominantIntent::Other, 0));
        if hits == 0 {
            (DominantIntent::Opinion, 0.4)
        } else {
            (intent, (0.5 + 0.1 * hits as f32).min(1.0))
        }
    }

    async fn classify_emotion(&self, text: &str) -> (DominantEmotion, f32) {
        let lowered = text.to_lowercase();
        let positive = count_hits(&lowered, POSITIVE_LEXICON);
        let negative = count_hits(&lowered, NEGATIVE_LEXICON);
        if negative > positive && negative > 0 {
            (DominantEmotion::Frustration, (0.5 + 0.1 * negative as f32).min(1.0))
        } else if positive > 0 {
            (DominantEmotion::Joy, (0.5 + 0.1 * positive as f32).min(1.0))
        } else {
            (DominantEmotion::Neutral, 0.5)
        }
    }

    async fn extract_entities(&self, text: &str) -> Vec<(String, f32)> {
        let lowered = text.to_lowercase();
        BUSINESS_ENTITY_WEIGHTS
            .iter()
            .filter(|(term, _)| lowered.contains(term))
            .map(|(term, weight)| (term.to_string(), *weight))
            .collect()
    }

    fn is_fallback(&self) -> bool {
        true
    }
}

fn count_hits(haystack: &str, cues: &[&str]) -> usize {
    cues.iter().filter(|cue| haystack.contains(*cue)).count()
}

pub struct SemanticEngine<P: ModelProvider> {
    provider: P,
}

impl<P: ModelProvider> SemanticEngine<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub async fn analyze(&self, text: &str) -> SemanticScore {
        let started = Instant::now();
        let score = self.analyze_inner(text).await;
        histogram!("semantic_latency_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        score
    }

    async fn analyze_inner(&self, text: &str) -> SemanticScore {
        let (dominant_intent, intent_clarity) = self.provider.classify_intent(text).await;
        let (dominant_emotion, emotion_confidence) = self.provider.classify_emotion(text).await;
        let entities = self.provider.extract_entities(text).await;

        let context_relevance = Self::context_relevance(text);
        let business_contexts = Self::business_contexts(text);
        let sentiment_strength = Self::sentiment_strength(text, emotion_confidence, dominant_emotion);
        let entity_richness = Self::entity_richness(&entities);
        let semantic_coherence = Self::semantic_coherence(text);
        let innovation_potential = Self::innovation_potential(text);
        let key_concepts = Self::key_concepts(text);

        SemanticScore {
            context_relevance,
            intent_clarity,
            sentiment_strength,
            entity_richness,
            semantic_coherence,
            innovation_potential,
            dominant_intent,
            dominant_emotion,
            business_contexts,
            key_concepts,
            confidence: if self.provider.is_fallback() { Confidence::Low } else { Confidence::High },
        }
    }

    pub async fn analyze_batch(&self, texts: &[String]) -> Vec<SemanticScore> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.analyze(text).await);
        }
        out
    }

    fn context_relevance(text: &str) -> f32 {
        let embedding = embed(text);
        BusinessContext::exemplars()
            .iter()
            .map(|(_, exemplar)| cosine_similarity(&embedding, &embed(exemplar)))
            .fold(0.0f32, f32::max)
    }

    fn business_contexts(text: &str) -> Vec<BusinessContext> {
        let embedding = embed(text);
        BusinessContext::exemplars()
            .into_iter()
            .filter(|(_, exemplar)| cosine_similarity(&embedding, &embed(exemplar)) >= 0.55)
            .map(|(tag, _)| tag)
            .collect()
    }

    fn sentiment_strength(text: &str, emotion_confidence: f32, emotion: DominantEmotion) -> f32 {
        let polarity = match emotion {
            DominantEmotion::Frustration | DominantEmotion::Anger | DominantEmotion::Sadness => -emotion_confidence,
            DominantEmotion::Joy | DominantEmotion::Surprise => emotion_confidence,
            DominantEmotion::Neutral => 0.0,
        };
        let _ = text;
        polarity.abs().clamp(0.0, 1.0)
    }

    fn entity_richness(entities: &[(String, f32)]) -> f32 {
        let total_weight: f32 = entities.iter().map(|(_, w)| w).sum();
        (total_weight / 5.0).clamp(0.0, 1.0)
    }

    fn semantic_coherence(text: &str) -> f32 {
        let sentences: Vec<&str> = text.split(['.', '!', '?']).map(str::trim).filter(|s| !s.is_empty()).collect();
        if sentences.len() <= 1 {
            return 1.0;
        }
        let embeddings: Vec<_> = sentences.iter().map(|s| embed(s)).collect();
        let mut total = 0.0f32;
        let mut pairs = 0usize;
        for i in 0..embeddings.len() {
            for j in (i + 1)..embeddings.len() {
                total += cosine_similarity(&embeddings[i], &embeddings[j]);
                pairs += 1;
            }
        }
        if pairs == 0 { 1.0 } else { (total / pairs as f32).clamp(0.0, 1.0) }
    }

    fn innovation_potential(text: &str) -> f32 {
        let lowered = text.to_lowercase();
        let cue_density = count_hits(&lowered, NOVELTY_LEXICON) as f32 / 3.0;
        let concepts = Self::key_concepts(text);
        let rarity_bonus = if concepts.len() >= 3 { 0.2 } else { 0.0 };
        (cue_density + rarity_bonus).clamp(0.0, 1.0)
    }

    fn key_concepts(text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut concepts = Vec::new();
        for token in text.split_whitespace() {
            let cleaned: String = token.chars().filter(|c| c.is_alphanumeric()).collect();
            if cleaned.len() < 4 {
                continue;
            }
            let lowered = cleaned.to_lowercase();
            if seen.insert(lowered.clone()) {
                concepts.push(lowered);
            }
            if concepts.len() >= 10 {
                break;
            }
        }
        concepts
    }
}

/// Classifies `text`'s highest-similarity problem-type exemplar set — a
/// thin wrapper over [`max_similarity_against`] shared with C5.
pub fn max_exemplar_similarity(text: &str, exemplars: &[&str]) -> f32 {
    max_similarity_against(text, exemplars)
}
