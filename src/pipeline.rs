//! Intelligence Pipeline orchestrator: wires C1 (fetch) through C10
//! (persistence) into one fetch-to-opportunities cycle (spec §5
//! "bounded-queue multi-producer/multi-consumer pipeline"). Platform fetches
//! run concurrently and feed a bounded `mpsc` channel into the quality gate;
//! the CPU-bound C4/C5 analysis stage runs with bounded concurrency via
//! `buffer_unordered`, sized off `available_parallelism`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::connectors::registry::ClientRegistry;
use crate::connectors::trait_::{FetchEvent, QuerySpec};
use crate::engines::clustering::{Cluster, ClusterItem, ClusteringEngine};
use crate::engines::credibility::CredibilityEngine;
use crate::engines::fusion::{ClusterFusionInput, FusionEngine};
use crate::engines::pain_point::{PainPointAssessment, PainPointDetector};
use crate::engines::quality::{EngagementDistribution, QualityValidator, ValidatedSignal};
use crate::engines::semantic::{ModelProvider, SemanticEngine, SemanticScore};
use crate::engines::temporal::{to_grid, TemporalEngine};
use crate::models::opportunity::Model as OpportunityModel;
use crate::models::platform_credibility::Model as PlatformCredibility;
use crate::models::signal::{Platform, Signal};
use crate::models::source_reliability::Model as SourceReliability;
use crate::store::IntelligenceStore;

/// Bounded queue depth between the fetch stage and the quality gate.
const FETCH_QUEUE_CAPACITY: usize = 256;

/// Sizes the CPU-bound analysis stage's concurrency off the machine's core
/// count, falling back to a conservative default when it can't be read.
fn analysis_concurrency() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

/// A signal that has cleared the quality gate and been scored by C4/C5,
/// ready for clustering.
struct AnalyzedSignal {
    signal: Signal,
    quality: crate::engines::quality::QualityScore,
    semantic: SemanticScore,
    pain: PainPointAssessment,
    credibility: f32,
}

/// Owns the engines and capability-trait dependencies for one pipeline
/// instance; constructed once at startup and passed through explicit
/// dependencies rather than a module-level singleton (spec §9).
pub struct IntelligencePipeline<P: ModelProvider> {
    registry: ClientRegistry,
    quality: QualityValidator,
    credibility: CredibilityEngine,
    semantic: Arc<SemanticEngine<P>>,
    clustering: ClusteringEngine,
    temporal: TemporalEngine,
    store: Arc<dyn IntelligenceStore>,
    fusion_top_k: usize,
}

impl<P: ModelProvider> IntelligencePipeline<P> {
    pub fn new(
        config: &AppConfig,
        registry: ClientRegistry,
        credibility: CredibilityEngine,
        model_provider: P,
        store: Arc<dyn IntelligenceStore>,
    ) -> Self {
        let grid = config.temporal_grid();
        Self {
            registry,
            quality: QualityValidator::new(config.quality_threshold),
            credibility,
            semantic: Arc::new(SemanticEngine::new(model_provider)),
            clustering: ClusteringEngine::default(),
            temporal: TemporalEngine::new(grid, config.temporal_window, (config.temporal_window / 2).max(1)),
            store,
            fusion_top_k: config.fusion_top_k,
        }
    }

    /// Runs one full cycle: fetch, validate, analyze, cluster, detect
    /// temporal patterns, fuse, rank, and persist. Best-effort throughout —
    /// a cancellation observed at any stage boundary short-circuits to an
    /// empty result rather than returning a partial, half-fused batch.
    pub async fn run_cycle(
        &self,
        query: QuerySpec,
        since: DateTime<Utc>,
        cancellation: CancellationToken,
    ) -> Vec<OpportunityModel> {
        let signals = self.fetch_all(query, since, cancellation.clone()).await;
        if cancellation.is_cancelled() || signals.is_empty() {
            return Vec::new();
        }

        let validated = self.validate(signals, cancellation.clone()).await;
        if cancellation.is_cancelled() || validated.is_empty() {
            return Vec::new();
        }

        let analyzed = self.analyze(validated, cancellation.clone()).await;
        if cancellation.is_cancelled() || analyzed.is_empty() {
            return Vec::new();
        }

        let clusters = self.cluster(&analyzed);
        let inputs = self.fuse_inputs(clusters, &analyzed);
        let opportunities = FusionEngine::fuse_and_rank(inputs, self.fusion_top_k);

        if let Err(err) = self.store.save_opportunities(opportunities.clone(), cancellation).await {
            warn!(error = %err, "failed to persist this cycle's opportunities");
        }

        opportunities
    }

    /// C1: fans out `query` to every active platform client concurrently,
    /// draining each client's stream into a single bounded channel. A
    /// client with no registered entry or a quarantined one is skipped
    /// rather than failing the whole cycle (spec §4.1/§7 "UnusableSource").
    async fn fetch_all(&self, query: QuerySpec, since: DateTime<Utc>, cancellation: CancellationToken) -> Vec<Signal> {
        let (tx, mut rx) = mpsc::channel::<Signal>(FETCH_QUEUE_CAPACITY);
        let mut handles = Vec::new();

        for platform in self.registry.active_platforms() {
            let client = match self.registry.get(platform) {
                Ok(client) => client,
                Err(err) => {
                    warn!(?platform, error = %err, "skipping client during fetch");
                    continue;
                }
            };
            let query = query.clone();
            let tx = tx.clone();
            let cancellation = cancellation.clone();
            handles.push(tokio::spawn(async move {
                let mut stream = client.fetch_recent(query, since).await;
                loop {
                    tokio::select! {
                        _ = cancellation.cancelled() => break,
                        event = stream.next() => match event {
                            Some(FetchEvent::Signal(signal)) => {
                                if tx.send(signal).await.is_err() {
                                    break;
                                }
                            }
                            Some(FetchEvent::PartialFetch { kind, fetched }) => {
                                warn!(?platform, ?kind, fetched, "fetch stopped before exhausting the query");
                            }
                            None => break,
                        },
                    }
                }
            }));
        }
        drop(tx);

        let mut signals = Vec::new();
        while let Some(signal) = rx.recv().await {
            signals.push(signal);
        }
        for handle in handles {
            let _ = handle.await;
        }
        self.registry.sweep_unusable();
        signals
    }

    /// C2/C3: resolves every distinct platform's credibility and every
    /// distinct author's reliability up front into plain maps, since
    /// `QualityValidator::validate_batch` takes synchronous closures and
    /// cannot await a database lookup per signal.
    async fn validate(&self, signals: Vec<Signal>, cancellation: CancellationToken) -> Vec<ValidatedSignal> {
        if cancellation.is_cancelled() {
            return Vec::new();
        }

        let platforms: HashSet<Platform> = signals.iter().map(|s| s.platform).collect();
        let mut credibility_cache: HashMap<Platform, PlatformCredibility> = HashMap::new();
        for platform in platforms {
            match self.credibility.score_for(platform).await {
                Ok(score) => {
                    credibility_cache.insert(platform, score);
                }
                Err(err) => warn!(?platform, error = %err, "falling back to seed credibility"),
            }
        }

        let authors: HashSet<(Platform, String)> = signals.iter().map(|s| (s.platform, s.author_ref.clone())).collect();
        let mut reliability_cache: HashMap<(Platform, String), SourceReliability> = HashMap::new();
        for (platform, author_ref) in authors {
            if cancellation.is_cancelled() {
                return Vec::new();
            }
            if let Ok(Some(reliability)) = self.store.source_reliability(platform, &author_ref, cancellation.clone()).await {
                reliability_cache.insert((platform, author_ref), reliability);
            }
        }

        let mut engagement_samples: HashMap<Platform, Vec<u64>> = HashMap::new();
        for signal in &signals {
            let total = signal.engagement.upvotes.unwrap_or(0) + signal.engagement.comments.unwrap_or(0);
            engagement_samples.entry(signal.platform).or_default().push(total);
        }
        let distributions: HashMap<Platform, EngagementDistribution> = engagement_samples
            .into_iter()
            .map(|(platform, samples)| (platform, EngagementDistribution::from_samples(&samples)))
            .collect();

        self.quality.validate_batch(
            signals.into_iter(),
            |signal| {
                credibility_cache.get(&signal.platform).cloned().unwrap_or_else(|| fallback_credibility(signal.platform))
            },
            |signal| reliability_cache.get(&(signal.platform, signal.author_ref.clone())).cloned(),
            |signal| distributions.get(&signal.platform).copied().unwrap_or_default(),
        )
    }

    /// C4/C5: scores every accepted signal's semantics and pain-point
    /// assessment with bounded concurrency, reusing the quality gate's
    /// already-blended `source_credibility` rather than re-querying C3.
    async fn analyze(&self, validated: Vec<ValidatedSignal>, cancellation: CancellationToken) -> Vec<AnalyzedSignal> {
        let semantic = Arc::clone(&self.semantic);
        let results: Vec<AnalyzedSignal> = stream::iter(validated)
            .map(|validated_signal| {
                let semantic = Arc::clone(&semantic);
                let store = Arc::clone(&self.store);
                let cancellation = cancellation.clone();
                async move {
                    let text = format!("{} {}", validated_signal.signal.title, validated_signal.signal.body);
                    let semantic_score = semantic.analyze(&text).await;
                    let pain = PainPointDetector::assess(&text, &semantic_score, validated_signal.quality.source_credibility);
                    if pain.detected {
                        metrics::counter!("pain_detected_total").increment(1);
                    }

                    if let Err(err) = store
                        .save_signal(&validated_signal.signal, &validated_signal.quality, &semantic_score, &pain, cancellation)
                        .await
                    {
                        warn!(signal_id = %validated_signal.signal.id, error = %err, "signal hot-cache write failed, continuing");
                    }

                    AnalyzedSignal {
                        signal: validated_signal.signal,
                        quality: validated_signal.quality,
                        semantic: semantic_score,
                        pain,
                        credibility: validated_signal.quality.source_credibility,
                    }
                }
            })
            .buffer_unordered(analysis_concurrency())
            .collect()
            .await;

        if cancellation.is_cancelled() {
            Vec::new()
        } else {
            results
        }
    }

    /// C7: groups analyzed signals into cross-platform clusters.
    fn cluster(&self, analyzed: &[AnalyzedSignal]) -> Vec<Cluster> {
        let items: Vec<ClusterItem> = analyzed
            .iter()
            .map(|a| ClusterItem {
                signal_id: a.signal.id,
                platform: a.signal.platform,
                created_at: a.signal.created_at,
                text: format!("{} {}", a.signal.title, a.signal.body),
                problem_type: a.pain.problem_type,
                intensity: a.pain.intensity,
            })
            .collect();
        let clusters = self.clustering.cluster(&items);
        for cluster in &clusters {
            metrics::counter!("clusters_formed_total", "universal" => if cluster.universal { "true" } else { "false" })
                .increment(1);
        }
        clusters
    }

    /// C6/C8 prep: for each cluster, averages its members' semantic and
    /// credibility scores and runs C6's temporal detection over the
    /// cluster's member timestamps, producing the fully-resolved input C8
    /// needs to fuse a ranked opportunity.
    fn fuse_inputs(&self, clusters: Vec<Cluster>, analyzed: &[AnalyzedSignal]) -> Vec<ClusterFusionInput> {
        let by_id: HashMap<Uuid, &AnalyzedSignal> = analyzed.iter().map(|a| (a.signal.id, a)).collect();

        clusters
            .into_iter()
            .map(|cluster| {
                let members: Vec<&AnalyzedSignal> =
                    cluster.member_signal_ids.iter().filter_map(|id| by_id.get(id).copied()).collect();
                let n = members.len().max(1) as f32;

                let semantic_relevance = members.iter().map(|m| m.semantic.context_relevance).sum::<f32>() / n;
                let innovation_potential = members.iter().map(|m| m.semantic.innovation_potential).sum::<f32>() / n;
                let credibility = members.iter().map(|m| m.credibility).sum::<f32>() / n;

                let events: Vec<(DateTime<Utc>, f64)> = members.iter().map(|m| (m.signal.created_at, 1.0)).collect();
                let series = to_grid(&events, self.temporal.grid);
                let temporal_patterns = self.temporal.detect(&series);

                ClusterFusionInput {
                    cluster,
                    semantic_relevance,
                    innovation_potential,
                    credibility,
                    temporal_patterns,
                }
            })
            .collect()
    }
}

/// Pure seed fallback used when C3's store-backed lookup errors, so the
/// quality gate always has a credibility value to score against.
fn fallback_credibility(platform: Platform) -> PlatformCredibility {
    let overall = crate::engines::credibility::seed_overall(platform);
    PlatformCredibility {
        platform,
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
