//! Source Credibility Engine (C3): per-platform and per-author credibility,
//! weight multiplier derivation, and the verification feedback loop. The
//! per-platform critical section is a fixed array of `tokio::sync::Mutex`
//! rather than a keyed map lock, since the platform set is small and closed
//! (spec §4.6 "bounded short critical section").

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tokio::sync::Mutex;

use crate::error::RepositoryError;
use crate::models::platform_credibility::Model as PlatformCredibility;
use crate::models::signal::Platform;
use crate::models::signal_verification::Model as SignalVerification;
use crate::models::source_reliability::Model as SourceReliability;
use crate::repositories::platform_credibility::PlatformCredibilityRepository;
use crate::repositories::signal_verification::SignalVerificationRepository;
use crate::repositories::source_reliability::SourceReliabilityRepository;

/// `α` for the per-(platform, author) EMA update (spec §4.6).
const VERIFICATION_ALPHA: f32 = 0.20;
/// `α` for the platform-level reliability EMA across active authors.
const PLATFORM_RELIABILITY_ALPHA: f32 = 0.05;

/// Fixed seed table of initial `overall` scores per platform (spec §4.6).
pub fn seed_overall(platform: Platform) -> f32 {
    match platform {
        Platform::StackOverflow => 0.92,
        Platform::GitHub => 0.82,
        Platform::HackerNews => 0.80,
        Platform::Reddit => 0.77,
        Platform::ProductHunt => 0.75,
        Platform::Twitter => 0.75,
        Platform::DevTo => 0.78,
        Platform::IndieHackers => 0.76,
    }
}

/// One lock per platform, indexed by `Platform::as_str` ordering. Guards the
/// read-modify-write sequence of a `record_verification` call without a
/// single global lock across all eight platforms.
struct PlatformLocks {
    locks: [Mutex<()>; 8],
}

impl PlatformLocks {
    fn new() -> Self {
        Self {
            locks: Default::default(),
        }
    }

    fn index(platform: Platform) -> usize {
        match platform {
            Platform::Reddit => 0,
            Platform::HackerNews => 1,
            Platform::ProductHunt => 2,
            Platform::GitHub => 3,
            Platform::StackOverflow => 4,
            Platform::Twitter => 5,
            Platform::DevTo => 6,
            Platform::IndieHackers => 7,
        }
    }
}

/// Owns C3's persistent rows and the locks guarding concurrent writers.
/// Constructed once at boot and passed through explicit dependencies, per
/// spec §9 ("avoid module-level singletons"). Cloning shares the same lock
/// table (`Arc<PlatformLocks>`), so every clone still serializes correctly
/// against every other — this is how the pipeline and the store end up
/// sharing one critical section despite holding separate handles.
#[derive(Clone)]
pub struct CredibilityEngine {
    db: sea_orm::DatabaseConnection,
    locks: Arc<PlatformLocks>,
    seed_overrides: std::collections::HashMap<Platform, f32>,
}

impl CredibilityEngine {
    pub fn new(db: sea_orm::DatabaseConnection, seed_overrides: std::collections::HashMap<Platform, f32>) -> Self {
        Self {
            db,
            locks: Arc::new(PlatformLocks::new()),
            seed_overrides,
        }
    }

    fn seed_for(&self, platform: Platform) -> f32 {
        self.seed_overrides.get(&platform).copied().unwrap_or_else(|| seed_overall(platform))
    }

    /// Returns the current snapshot for `platform`, seeding it on first
    /// access.
    pub async fn score_for(&self, platform: Platform) -> Result<PlatformCredibility, RepositoryError> {
        PlatformCredibilityRepository::new(&self.db)
            .get_or_seed(platform, self.seed_for(platform))
            .await
    }

    /// `weight_for` — [0.1, 2.0] multiplier, optionally folding in a
    /// specific author's reliability the same way C2's
    /// `source_credibility` dimension does.
    pub async fn weight_for(&self, platform: Platform, author_ref: Option<&str>) -> Result<f32, RepositoryError> {
        let credibility = self.score_for(platform).await?;
        let Some(author_ref) = author_ref else {
            return Ok(credibility.weight_multiplier);
        };

        let reliability = SourceReliabilityRepository::new(&self.db).get(platform, author_ref).await?;
        let Some(reliability) = reliability else {
            return Ok(credibility.weight_multiplier);
        };

        let blended_overall = 0.5 * credibility.overall + 0.5 * reliability.decayed_accuracy(Utc::now());
        Ok(PlatformCredibility::derive_weight_multiplier(blended_overall))
    }

    /// Appends a verification record and updates derived fields, atomically
    /// per platform (spec §4.6 update rule). `author_ref` identifies the
    /// `(platform, author_ref)` reliability row to update — `SignalVerification`
    /// itself only carries `signal_id` (spec §3), so the caller (which still
    /// holds the originating `Signal`) supplies the author separately.
    pub async fn record_verification(
        &self,
        verification: SignalVerification,
        author_ref: &str,
    ) -> Result<(), RepositoryError> {
        let platform = verification.platform;
        let _guard = self.locks.locks[PlatformLocks::index(platform)].lock().await;

        let mut credibility = PlatformCredibilityRepository::new(&self.db)
            .get_or_seed(platform, self.seed_for(platform))
            .await?;

        let reliability_repo = SourceReliabilityRepository::new(&self.db);
        let mut reliability = reliability_repo.get_or_create(platform, author_ref, credibility.overall).await?;

        let correct = verification.was_correct();
        reliability.signals_seen += 1;
        if verification.verified_pain {
            reliability.signals_verified_true += 1;
        } else {
            reliability.signals_verified_false += 1;
        }
        let outcome = if correct { 1.0f32 } else { 0.0f32 };
        reliability.ema_accuracy = VERIFICATION_ALPHA * outcome + (1.0 - VERIFICATION_ALPHA) * reliability.ema_accuracy;
        reliability.last_observed_at = verification.verified_at;
        let reliability = reliability_repo.put(reliability).await?;

        SignalVerificationRepository::new(&self.db).append(verification).await?;

        credibility.reliability =
            PLATFORM_RELIABILITY_ALPHA * reliability.ema_accuracy + (1.0 - PLATFORM_RELIABILITY_ALPHA) * credibility.reliability;
        credibility.overall = 0.40 * credibility.reliability
            + 0.15 * credibility.freshness
            + 0.15 * credibility.influence
            + 0.15 * credibility.consistency
            + 0.15 * credibility.verification;
        credibility.overall = credibility.overall.clamp(0.0, 1.0);
        credibility.weight_multiplier = PlatformCredibility::derive_weight_multiplier(credibility.overall);
        credibility.sample_size += 1;

        PlatformCredibilityRepository::new(&self.db).put(credibility).await?;
        counter!("credibility_updates_total").increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_table_matches_spec_values() {
        assert_eq!(seed_overall(Platform::StackOverflow), 0.92);
        assert_eq!(seed_overall(Platform::GitHub), 0.82);
        assert_eq!(seed_overall(Platform::HackerNews), 0.80);
        assert_eq!(seed_overall(Platform::Reddit), 0.77);
        assert_eq!(seed_overall(Platform::ProductHunt), 0.75);
        assert_eq!(seed_overall(Platform::Twitter), 0.75);
        assert_eq!(seed_overall(Platform::DevTo), 0.78);
        assert_eq!(seed_overall(Platform::IndieHackers), 0.76);
    }

    #[test]
    fn weight_multiplier_is_monotonic_in_overall() {
        let low = PlatformCredibility::derive_weight_multiplier(0.1);
        let mid = PlatformCredibility::derive_weight_multiplier(0.5);
        let high = PlatformCredibility::derive_weight_multiplier(0.9);
        assert!(low < mid);
        assert!(mid < high);
        assert!((0.1..=2.0).contains(&low));
        assert!((0.1..=2.0).contains(&high));
    }
}
