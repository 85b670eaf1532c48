//! Intelligence Store (C10): the capability trait every persistence backend
//! implements, plus the SeaORM-backed implementation, grounded directly on
//! the teacher's `repositories::*` + `migration::Migrator` pairing.

pub mod sea_orm_store;
pub mod trait_;

pub use sea_orm_store::SeaOrmStore;
pub use trait_::IntelligenceStore;
