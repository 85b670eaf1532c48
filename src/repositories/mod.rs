//! # Repository Layer
//!
//! SeaORM-backed access to the C10 Intelligence Store's persisted tables:
//! one repository per entity, following the teacher's per-entity
//! repository convention (`repositories::signal`, `repositories::tenant`).

pub mod conversation;
pub mod opportunity;
pub mod platform_credibility;
pub mod signal;
pub mod signal_verification;
pub mod source_reliability;

pub use conversation::ConversationRepository;
pub use opportunity::OpportunityRepository;
pub use platform_credibility::PlatformCredibilityRepository;
pub use signal::SignalRepository;
pub use signal_verification::SignalVerificationRepository;
pub use source_reliability::SourceReliabilityRepository;
