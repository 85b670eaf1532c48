//! # Data Models
//!
//! Value objects and SeaORM entities for the intelligence pipeline's
//! persisted state: platform credibility, source reliability, signal
//! verification history, opportunity history, and the optional signal and
//! conversation-turn caches.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod conversation;
pub mod opportunity;
pub mod platform_credibility;
pub mod signal;
pub mod signal_verification;
pub mod source_reliability;

pub use conversation::{ConversationTurn, Entity as ConversationTurnRow};
pub use opportunity::{Entity as Opportunity, MarketTiming, OpportunityComponents, OpportunityResponse};
pub use platform_credibility::Entity as PlatformCredibility;
pub use signal::{Engagement, Platform, Signal};
pub use signal_verification::Entity as SignalVerification;
pub use source_reliability::Entity as SourceReliability;

/// Basic service information response for the demo host.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "luciq".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
