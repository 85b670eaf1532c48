//! Signal value object and its optional persisted cache row.
//!
//! A [`Signal`] is the unit of evidence ingested from a platform client (C1)
//! and carried through the pipeline. Persisting it is optional per the
//! storage contract (C10) — a deployment may keep signals purely in-memory
//! and only persist the four required tables — so the SeaORM entity here
//! backs a cache table, while [`Signal`] itself is a plain value type used
//! throughout the engines regardless of whether that cache is enabled.

use chrono::{DateTime, Utc};
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

/// The platforms a client can originate signals from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Platform {
    #[sea_orm(string_value = "reddit")]
    #[serde(rename = "reddit")]
    Reddit,
    #[sea_orm(string_value = "hacker_news")]
    #[serde(rename = "hacker_news")]
    HackerNews,
    #[sea_orm(string_value = "product_hunt")]
    #[serde(rename = "product_hunt")]
    ProductHunt,
    #[sea_orm(string_value = "github")]
    #[serde(rename = "github")]
    GitHub,
    #[sea_orm(string_value = "stack_overflow")]
    #[serde(rename = "stack_overflow")]
    StackOverflow,
    #[sea_orm(string_value = "twitter")]
    #[serde(rename = "twitter")]
    Twitter,
    #[sea_orm(string_value = "dev_to")]
    #[serde(rename = "dev_to")]
    DevTo,
    #[sea_orm(string_value = "indie_hackers")]
    #[serde(rename = "indie_hackers")]
    IndieHackers,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Reddit => "reddit",
            Platform::HackerNews => "hacker_news",
            Platform::ProductHunt => "product_hunt",
            Platform::GitHub => "github",
            Platform::StackOverflow => "stack_overflow",
            Platform::Twitter => "twitter",
            Platform::DevTo => "dev_to",
            Platform::IndieHackers => "indie_hackers",
        }
    }

    pub fn all() -> [Platform; 8] {
        [
            Platform::Reddit,
            Platform::HackerNews,
            Platform::ProductHunt,
            Platform::GitHub,
            Platform::StackOverflow,
            Platform::Twitter,
            Platform::DevTo,
            Platform::IndieHackers,
        ]
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reddit" => Ok(Platform::Reddit),
            "hacker_news" => Ok(Platform::HackerNews),
            "product_hunt" => Ok(Platform::ProductHunt),
            "github" => Ok(Platform::GitHub),
            "stack_overflow" => Ok(Platform::StackOverflow),
            "twitter" => Ok(Platform::Twitter),
            "dev_to" => Ok(Platform::DevTo),
            "indie_hackers" => Ok(Platform::IndieHackers),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

/// Engagement counters, all optional since not every platform reports all
/// three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Engagement {
    pub upvotes: Option<u64>,
    pub comments: Option<u64>,
    pub views: Option<u64>,
}

/// A unit of evidence ingested from a platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Signal {
    pub id: Uuid,
    pub platform: Platform,
    pub author_ref: String,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub ingested_at: DateTime<Utc>,
    pub title: String,
    pub body: String,
    pub engagement: Engagement,
    pub url: Option<String>,
}

/// Errors a [`Signal`] can fail to construct for.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignalConstructionError {
    #[error("signal has neither title nor body")]
    Empty,
    #[error("ingested_at ({ingested_at}) precedes created_at - 1h skew ({earliest_allowed})")]
    IngestedBeforeCreated {
        ingested_at: DateTime<Utc>,
        earliest_allowed: DateTime<Utc>,
    },
}

impl Signal {
    /// Builds a signal, enforcing the invariants from the data model: at
    /// least one of title/body must be non-empty, and `ingested_at` cannot
    /// precede `created_at` by more than an hour of clock skew.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        platform: Platform,
        author_ref: impl Into<String>,
        created_at: DateTime<Utc>,
        ingested_at: DateTime<Utc>,
        title: impl Into<String>,
        body: impl Into<String>,
        engagement: Engagement,
        url: Option<String>,
    ) -> Result<Self, SignalConstructionError> {
        let title = title.into();
        let body = body.into();
        if title.trim().is_empty() && body.trim().is_empty() {
            return Err(SignalConstructionError::Empty);
        }

        let earliest_allowed = created_at - chrono::Duration::hours(1);
        if ingested_at < earliest_allowed {
            return Err(SignalConstructionError::IngestedBeforeCreated {
                ingested_at,
                earliest_allowed,
            });
        }

        Ok(Self {
            id,
            platform,
            author_ref: author_ref.into(),
            created_at,
            ingested_at,
            title,
            body,
            engagement,
            url,
        })
    }

    /// Stable content-derived key used to suppress duplicate ingestion of the
    /// same upstream item across retries/re-polls.
    pub fn dedupe_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.platform.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.id.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Optional persisted cache row mirroring [`Signal`].
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "signals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub platform: Platform,
    pub author_ref: String,
    pub created_at: DateTimeWithTimeZone,
    pub ingested_at: DateTimeWithTimeZone,
    pub title: String,
    pub body: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub engagement: Json,
    pub url: Option<String>,
    pub dedupe_key: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub quality_score: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub semantic_score: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub pain_assessment: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Signal {
    type Error = serde_json::Error;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Signal {
            id: model.id,
            platform: model.platform,
            author_ref: model.author_ref,
            created_at: model.created_at.with_timezone(&Utc),
            ingested_at: model.ingested_at.with_timezone(&Utc),
            title: model.title,
            body: model.body,
            engagement: serde_json::from_value(model.engagement)?,
            url: model.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn rejects_signal_with_no_title_or_body() {
        let created = base_time();
        let err = Signal::new(
            Uuid::new_v4(),
            Platform::Reddit,
            "u/someone",
            created,
            created,
            "",
            "   ",
            Engagement::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(err, SignalConstructionError::Empty);
    }

    #[test]
    fn rejects_ingested_at_before_created_minus_skew() {
        let created = base_time();
        let ingested = created - Duration::hours(2);
        let err = Signal::new(
            Uuid::new_v4(),
            Platform::GitHub,
            "octocat",
            created,
            ingested,
            "title",
            "",
            Engagement::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SignalConstructionError::IngestedBeforeCreated { .. }));
    }

    #[test]
    fn accepts_ingested_at_within_skew_window() {
        let created = base_time();
        let ingested = created - Duration::minutes(30);
        let signal = Signal::new(
            Uuid::new_v4(),
            Platform::GitHub,
            "octocat",
            created,
            ingested,
            "title",
            "",
            Engagement::default(),
            None,
        )
        .unwrap();
        assert_eq!(signal.created_at, created);
    }

    #[test]
    fn dedupe_key_is_stable_for_same_platform_and_id() {
        let id = Uuid::new_v4();
        let created = base_time();
        let a = Signal::new(
            id,
            Platform::Reddit,
            "u/a",
            created,
            created,
            "t",
            "",
            Engagement::default(),
            None,
        )
        .unwrap();
        let b = Signal::new(
            id,
            Platform::Reddit,
            "u/b",
            created,
            created,
            "different title",
            "different body",
            Engagement {
                upvotes: Some(5),
                ..Default::default()
            },
            Some("https://example.com".into()),
        )
        .unwrap();
        assert_eq!(a.dedupe_key(), b.dedupe_key());
    }

    #[test]
    fn platform_slug_round_trips_through_from_str() {
        for platform in Platform::all() {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
        assert!("not_a_platform".parse::<Platform>().is_err());
    }
}
