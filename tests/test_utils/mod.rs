//! Shared harness for cross-engine integration tests: an in-memory SQLite
//! database with every migration applied, plus a fixture [`PlatformClient`]
//! that replays a fixed batch of signals instead of calling a real API.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use luciq_core::connectors::{FetchEvent, PlatformClient, QuerySpec};
use luciq_core::error::ClientError;
use luciq_core::models::signal::{Platform, Signal};

#[allow(dead_code)]
pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect in-memory sqlite");
    Migrator::up(&db, None).await.expect("apply migrations");
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await
    .expect("disable sqlite foreign key enforcement");
    db
}

/// A [`PlatformClient`] that replays a fixed set of signals once, ignoring
/// `query`/`since` — enough to drive a full pipeline cycle deterministically
/// without reaching out to a real platform.
pub struct FixtureClient {
    platform: Platform,
    signals: Vec<Signal>,
    unusable: AtomicBool,
}

#[allow(dead_code)]
impl FixtureClient {
    pub fn new(platform: Platform, signals: Vec<Signal>) -> Self {
        Self {
            platform,
            signals,
            unusable: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl PlatformClient for FixtureClient {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_recent(&self, _query: QuerySpec, _since: DateTime<Utc>) -> BoxStream<'_, FetchEvent> {
        stream::iter(self.signals.clone().into_iter().map(FetchEvent::Signal)).boxed()
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Signal>, ClientError> {
        Ok(self.signals.iter().find(|s| s.id.to_string() == id).cloned())
    }

    fn is_unusable(&self) -> bool {
        self.unusable.load(Ordering::SeqCst)
    }
}
