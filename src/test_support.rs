//! Shared `#[cfg(test)]` database bootstrap, used by every engine,
//! repository, and store test module so each one doesn't have to repeat the
//! sqlite-in-memory-plus-migrations dance.

#![cfg(test)]

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

/// Spins up an in-memory SQLite database with every migration applied.
///
/// `AppConfig::default()`'s `database_url` points at the local-profile
/// Postgres instance; tests never want that, so this bypasses
/// `db::init_pool`/`ConfigLoader` entirely and connects straight to
/// `sqlite::memory:`.
pub async fn test_db() -> DatabaseConnection {
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
