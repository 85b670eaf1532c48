//! Database migrations for the Luciq intelligence pipeline's persistence
//! layer (C10): the four required tables plus the optional `signals` cache
//! and `conversation_turns`, per spec §6 "Persisted state layout".

pub use sea_orm_migration::prelude::*;

mod m2026_01_01_000001_create_platform_credibility;
mod m2026_01_01_000002_create_source_reliability;
mod m2026_01_01_000003_create_signal_verification;
mod m2026_01_01_000004_create_opportunity_history;
mod m2026_01_01_000005_create_signals;
mod m2026_01_01_000006_create_conversation_turns;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_01_000001_create_platform_credibility::Migration),
            Box::new(m2026_01_01_000002_create_source_reliability::Migration),
            Box::new(m2026_01_01_000003_create_signal_verification::Migration),
            Box::new(m2026_01_01_000004_create_opportunity_history::Migration),
            Box::new(m2026_01_01_000005_create_signals::Migration),
            Box::new(m2026_01_01_000006_create_conversation_turns::Migration),
        ]
    }
}