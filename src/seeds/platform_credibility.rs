//! Seeds the eight platform credibility rows at boot so the demo host and
//! the pipeline's first cycle both see a fully-populated C3 table instead of
//! seeding rows lazily, one at a time, on first access.

use sea_orm::DatabaseConnection;

use crate::engines::credibility::seed_overall;
use crate::error::RepositoryError;
use crate::models::signal::Platform;
use crate::repositories::platform_credibility::PlatformCredibilityRepository;

/// The closed, fixed platform set (spec §2) — kept as a literal list rather
/// than an enum iterator since it almost never changes and a new entry
/// should be a deliberate, reviewed addition here.
const ALL_PLATFORMS: [Platform; 8] = [
    Platform::Reddit,
    Platform::HackerNews,
    Platform::ProductHunt,
    Platform::GitHub,
    Platform::StackOverflow,
    Platform::Twitter,
    Platform::DevTo,
    Platform::IndieHackers,
];

/// Ensures every platform has a credibility row, seeding whichever are
/// missing. Idempotent: a platform that already has a row is left alone.
pub async fn seed_platform_credibility(db: &DatabaseConnection) -> Result<(), RepositoryError> {
    let repo = PlatformCredibilityRepository::new(db);
    for platform in ALL_PLATFORMS {
        repo.get_or_seed(platform, seed_overall(platform)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn seeds_every_platform_exactly_once() {
        let db = test_db().await;
        seed_platform_credibility(&db).await.unwrap();

        let repo = PlatformCredibilityRepository::new(&db);
        let rows = repo.list_all().await.unwrap();
        assert_eq!(rows.len(), ALL_PLATFORMS.len());
    }
}
