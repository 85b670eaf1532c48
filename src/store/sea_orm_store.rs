//! SeaORM-backed [`IntelligenceStore`] implementation (C10).
//!
//! Writes are attempted against the configured timeout (spec §5 "intelligence
//! store write 5s"); a write that times out is queued in a bounded in-memory
//! outbox rather than failing the caller (spec §7 `StoreTimeout`:
//! "verifications and opportunities are retried via an in-memory outbox").
//! `flush_outbox` is the retry path, intended to be driven by the pipeline on
//! an interval. On overflow, oldest non-verification entries are dropped
//! first and counted — verifications are never silently lost.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::engines::credibility::CredibilityEngine;
use crate::engines::pain_point::PainPointAssessment;
use crate::engines::quality::QualityScore;
use crate::engines::semantic::SemanticScore;
use crate::error::StoreError;
use crate::models::conversation::{ConversationRole, ConversationTurn};
use crate::models::opportunity::Model as OpportunityModel;
use crate::models::platform_credibility::Model as PlatformCredibilityModel;
use crate::models::signal::{Platform, Signal};
use crate::models::signal_verification::Model as SignalVerificationModel;
use crate::models::source_reliability::Model as SourceReliabilityModel;
use crate::repositories::conversation::ConversationRepository;
use crate::repositories::opportunity::OpportunityRepository;
use crate::repositories::signal::SignalRepository;
use crate::repositories::source_reliability::SourceReliabilityRepository;

use super::trait_::IntelligenceStore;

/// Outbox capacity before non-verification entries start getting dropped.
const OUTBOX_CAPACITY: usize = 512;

/// A write that didn't complete before the store timeout, queued for retry.
enum OutboxEntry {
    Opportunities(Vec<OpportunityModel>),
    Verification {
        record: SignalVerificationModel,
        author_ref: String,
    },
    ConversationTurn {
        conversation_id: Uuid,
        role: ConversationRole,
        content: String,
    },
}

impl OutboxEntry {
    fn is_verification(&self) -> bool {
        matches!(self, OutboxEntry::Verification { .. })
    }
}

pub struct SeaOrmStore {
    db: DatabaseConnection,
    credibility: CredibilityEngine,
    timeout: Duration,
    outbox: Mutex<VecDeque<OutboxEntry>>,
    outbox_dropped: AtomicU64,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection, credibility: CredibilityEngine, timeout: Duration) -> Self {
        Self {
            db,
            credibility,
            timeout,
            outbox: Mutex::new(VecDeque::new()),
            outbox_dropped: AtomicU64::new(0),
        }
    }

    /// Queues `entry`, evicting the oldest non-verification entry first if
    /// the outbox is already at capacity (spec §4.10/§7 "oldest
    /// non-verification entries are dropped and counted").
    async fn enqueue(&self, entry: OutboxEntry) {
        let mut outbox = self.outbox.lock().await;
        if outbox.len() >= OUTBOX_CAPACITY {
            let evict_at = outbox.iter().position(|e| !e.is_verification());
            match evict_at {
                Some(index) => {
                    outbox.remove(index);
                    self.outbox_dropped.fetch_add(1, Ordering::Relaxed);
                }
                None => {
                    // Outbox is full of verifications alone; drop the oldest
                    // one rather than grow unbounded.
                    outbox.pop_front();
                    self.outbox_dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        outbox.push_back(entry);
    }

    async fn apply_entry(&self, entry: &OutboxEntry) -> Result<(), StoreError> {
        match entry {
            OutboxEntry::Opportunities(batch) => OpportunityRepository::new(&self.db)
                .save_batch(batch.clone())
                .await
                .map_err(StoreError::from),
            OutboxEntry::Verification { record, author_ref } => self
                .credibility
                .record_verification(record.clone(), author_ref)
                .await
                .map_err(StoreError::from),
            OutboxEntry::ConversationTurn {
                conversation_id,
                role,
                content,
            } => ConversationRepository::new(&self.db)
                .append_turn(*conversation_id, *role, content.clone())
                .await
                .map(|_| ())
                .map_err(StoreError::from),
        }
    }

}

#[async_trait]
impl IntelligenceStore for SeaOrmStore {
    async fn save_opportunities(
        &self,
        opportunities: Vec<OpportunityModel>,
        cancellation: CancellationToken,
    ) -> Result<(), StoreError> {
        if cancellation.is_cancelled() {
            return Err(StoreError::Cancelled(crate::error::Cancelled));
        }
        let repo = OpportunityRepository::new(&self.db);
        match tokio::time::timeout(self.timeout, repo.save_batch(opportunities.clone())).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                self.enqueue(OutboxEntry::Opportunities(opportunities)).await;
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }

    async fn recent_opportunities(&self, limit: u64, cancellation: CancellationToken) -> Result<Vec<OpportunityModel>, StoreError> {
        if cancellation.is_cancelled() {
            return Err(StoreError::Cancelled(crate::error::Cancelled));
        }
        let repo = OpportunityRepository::new(&self.db);
        tokio::time::timeout(self.timeout, repo.recent(limit))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
            .map_err(StoreError::from)
    }

    async fn platform_credibility(&self, platform: Platform, cancellation: CancellationToken) -> Result<PlatformCredibilityModel, StoreError> {
        if cancellation.is_cancelled() {
            return Err(StoreError::Cancelled(crate::error::Cancelled));
        }
        tokio::time::timeout(self.timeout, self.credibility.score_for(platform))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
            .map_err(StoreError::from)
    }

    async fn source_reliability(
        &self,
        platform: Platform,
        author_ref: &str,
        cancellation: CancellationToken,
    ) -> Result<Option<SourceReliabilityModel>, StoreError> {
        if cancellation.is_cancelled() {
            return Err(StoreError::Cancelled(crate::error::Cancelled));
        }
        let repo = SourceReliabilityRepository::new(&self.db);
        tokio::time::timeout(self.timeout, repo.get(platform, author_ref))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
            .map_err(StoreError::from)
    }

    async fn record_verification(
        &self,
        verification: SignalVerificationModel,
        author_ref: String,
        cancellation: CancellationToken,
    ) -> Result<(), StoreError> {
        if cancellation.is_cancelled() {
            return Err(StoreError::Cancelled(crate::error::Cancelled));
        }
        let attempt = self.credibility.record_verification(verification.clone(), &author_ref);
        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                self.enqueue(OutboxEntry::Verification {
                    record: verification,
                    author_ref,
                })
                .await;
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }

    async fn append_conversation_turn(
        &self,
        conversation_id: Uuid,
        role: ConversationRole,
        content: String,
        cancellation: CancellationToken,
    ) -> Result<(), StoreError> {
        if cancellation.is_cancelled() {
            return Err(StoreError::Cancelled(crate::error::Cancelled));
        }
        let repo = ConversationRepository::new(&self.db);
        match tokio::time::timeout(self.timeout, repo.append_turn(conversation_id, role, content.clone())).await {
            Ok(result) => result.map(|_| ()).map_err(StoreError::from),
            Err(_) => {
                self.enqueue(OutboxEntry::ConversationTurn {
                    conversation_id,
                    role,
                    content,
                })
                .await;
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }

    async fn recent_conversation_turns(
        &self,
        conversation_id: Uuid,
        limit: u64,
        cancellation: CancellationToken,
    ) -> Result<Vec<ConversationTurn>, StoreError> {
        if cancellation.is_cancelled() {
            return Err(StoreError::Cancelled(crate::error::Cancelled));
        }
        let repo = ConversationRepository::new(&self.db);
        let rows = tokio::time::timeout(self.timeout, repo.recent_turns(conversation_id, limit))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
            .map_err(StoreError::from)?;
        Ok(rows.into_iter().map(ConversationTurn::from).collect())
    }

    /// Best-effort write to the optional hot cache: unlike the required
    /// tables above, a timeout or failure here is swallowed rather than
    /// queued — the cache is a convenience, not load-bearing state the rest
    /// of the pipeline depends on (spec §4.10 "optional hot cache").
    async fn save_signal(
        &self,
        signal: &Signal,
        quality: &QualityScore,
        semantic: &SemanticScore,
        pain: &PainPointAssessment,
        cancellation: CancellationToken,
    ) -> Result<(), StoreError> {
        if cancellation.is_cancelled() {
            return Err(StoreError::Cancelled(crate::error::Cancelled));
        }
        let repo = SignalRepository::new(&self.db);
        match tokio::time::timeout(self.timeout, repo.save(signal, quality, semantic, pain)).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                tracing::warn!(signal_id = %signal.id, "signal cache write timed out, dropping");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }

    async fn flush_outbox(&self) {
        let pending: Vec<OutboxEntry> = {
            let mut outbox = self.outbox.lock().await;
            outbox.drain(..).collect()
        };
        for entry in pending {
            if let Err(err) = self.apply_entry(&entry).await {
                tracing::warn!(error = %err, "outbox retry failed, re-queuing entry");
                self.enqueue(entry).await;
            }
        }
    }

    fn outbox_dropped_count(&self) -> u64 {
        self.outbox_dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use chrono::Utc;

    async fn test_store() -> SeaOrmStore {
        let db = test_db().await;
        let credibility = CredibilityEngine::new(db.clone(), std::collections::HashMap::new());
        SeaOrmStore::new(db, credibility, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn platform_credibility_seeds_on_first_access() {
        let store = test_store().await;
        let credibility = store
            .platform_credibility(Platform::StackOverflow, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(credibility.overall, 0.92);
    }

    #[tokio::test]
    async fn save_and_recent_opportunities_round_trip() {
        let store = test_store().await;
        let opportunity = OpportunityModel {
            opportunity_id: Uuid::new_v4(),
            title: "title".to_string(),
            summary: "summary".to_string(),
            cluster_ref: "cluster".to_string(),
            composite_score: 0.7,
            component_semantic: 0.5,
            component_temporal_momentum: 0.5,
            component_innovation: 0.5,
            component_emergence_probability: 0.5,
            component_credibility: 0.5,
            component_pain_intensity: 0.5,
            market_timing: crate::models::opportunity::MarketTiming::Now,
            risk_factors: serde_json::json!([]),
            supporting_signals: serde_json::json!([]),
            generated_at: Utc::now().into(),
        };
        store
            .save_opportunities(vec![opportunity.clone()], CancellationToken::new())
            .await
            .unwrap();
        let recent = store.recent_opportunities(10, CancellationToken::new()).await.unwrap();
        assert!(recent.iter().any(|o| o.opportunity_id == opportunity.opportunity_id));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_before_any_write() {
        let store = test_store().await;
        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let result = store.recent_opportunities(10, cancellation).await;
        assert!(matches!(result, Err(StoreError::Cancelled(_))));
    }

    #[tokio::test]
    async fn outbox_starts_with_nothing_dropped() {
        let store = test_store().await;
        assert_eq!(store.outbox_dropped_count(), 0);
        store.flush_outbox().await;
        assert_eq!(store.outbox_dropped_count(), 0);
    }
}
