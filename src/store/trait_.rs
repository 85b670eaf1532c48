//! Intelligence Store capability trait (C10).
//!
//! Mirrors the shape of [`crate::connectors::trait_::PlatformClient`]: the
//! core depends on this narrow contract, never on SeaORM directly, so a
//! future backend (a different database, an in-memory test double) only
//! needs to implement this trait.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

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

/// The four required tables plus the two optional ones (spec §4.10/§6
/// "Persisted state layout"), exposed as one narrow read/write contract.
#[async_trait]
pub trait IntelligenceStore: Send + Sync {
    async fn save_opportunities(
        &self,
        opportunities: Vec<OpportunityModel>,
        cancellation: CancellationToken,
    ) -> Result<(), StoreError>;

    async fn recent_opportunities(&self, limit: u64, cancellation: CancellationToken) -> Result<Vec<OpportunityModel>, StoreError>;

    async fn platform_credibility(&self, platform: Platform, cancellation: CancellationToken) -> Result<PlatformCredibilityModel, StoreError>;

    async fn source_reliability(
        &self,
        platform: Platform,
        author_ref: &str,
        cancellation: CancellationToken,
    ) -> Result<Option<SourceReliabilityModel>, StoreError>;

    async fn record_verification(
        &self,
        verification: SignalVerificationModel,
        author_ref: String,
        cancellation: CancellationToken,
    ) -> Result<(), StoreError>;

    async fn append_conversation_turn(
        &self,
        conversation_id: Uuid,
        role: ConversationRole,
        content: String,
        cancellation: CancellationToken,
    ) -> Result<(), StoreError>;

    async fn recent_conversation_turns(
        &self,
        conversation_id: Uuid,
        limit: u64,
        cancellation: CancellationToken,
    ) -> Result<Vec<ConversationTurn>, StoreError>;

    /// Optional hot-cache write for one enriched signal (spec §4.10
    /// "save_signal ... optional hot cache"). Implementations that don't
    /// maintain the cache may no-op.
    async fn save_signal(
        &self,
        signal: &Signal,
        quality: &QualityScore,
        semantic: &SemanticScore,
        pain: &PainPointAssessment,
        cancellation: CancellationToken,
    ) -> Result<(), StoreError>;

    /// Retries whatever writes previously timed out into the outbox.
    /// Best-effort: failures here are logged, not surfaced, since the
    /// caller has no operation to fail.
    async fn flush_outbox(&self);

    /// Number of outbox entries dropped so far due to capacity overflow
    /// (spec §4.10 "oldest non-verification entries are dropped and
    /// counted").
    fn outbox_dropped_count(&self) -> u64;
}
