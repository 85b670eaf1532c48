//! Cross-engine integration tests: drives a full pipeline cycle (C1 fetch
//! through C10 persistence) against fixture platform clients and a real
//! in-memory database, rather than unit-testing one engine in isolation.

mod test_utils;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use luciq_core::config::AppConfig;
use luciq_core::connectors::{ClientRegistry, QuerySpec};
use luciq_core::engines::credibility::CredibilityEngine;
use luciq_core::engines::semantic::LexicalFallbackProvider;
use luciq_core::models::signal::{Engagement, Platform, Signal};
use luciq_core::pipeline::IntelligencePipeline;
use luciq_core::store::{IntelligenceStore, SeaOrmStore};

use test_utils::{setup_test_db, FixtureClient};

/// Builds one near-identical cost complaint, worded slightly differently per
/// platform the way three independent posters would, so C7 still has to
/// cluster them rather than trivially deduping identical text.
fn cost_complaint_signal(platform: Platform, author: &str, suffix: &str, upvotes: u64, comments: u64) -> Signal {
    let now = Utc::now();
    Signal::new(
        Uuid::new_v4(),
        platform,
        author,
        now - chrono::Duration::hours(2),
        now,
        "wish there was a cheaper subscription pricing tool for our startup",
        format!("our small saas team keeps outgrowing the free tier and the renewal quote is brutal {suffix}"),
        Engagement {
            upvotes: Some(upvotes),
            comments: Some(comments),
            views: None,
        },
        None,
    )
    .expect("fixture signal satisfies construction invariants")
}

async fn build_pipeline(
    registry: ClientRegistry,
) -> (IntelligencePipeline<LexicalFallbackProvider>, Arc<SeaOrmStore>) {
    let config = AppConfig::default();
    let db = setup_test_db().await;
    let credibility = CredibilityEngine::new(db.clone(), HashMap::new());
    let store = Arc::new(SeaOrmStore::new(db, credibility.clone(), Duration::from_secs(5)));
    let pipeline = IntelligencePipeline::new(&config, registry, credibility, LexicalFallbackProvider, store.clone());
    (pipeline, store)
}

#[tokio::test]
async fn near_identical_cross_platform_complaints_yield_a_persisted_opportunity() {
    let mut registry = ClientRegistry::new();
    registry.register(Arc::new(FixtureClient::new(
        Platform::Reddit,
        vec![cost_complaint_signal(Platform::Reddit, "u/founder_a", "honestly", 42, 11)],
    )));
    registry.register(Arc::new(FixtureClient::new(
        Platform::HackerNews,
        vec![cost_complaint_signal(Platform::HackerNews, "hn_poster", "again", 58, 20)],
    )));
    registry.register(Arc::new(FixtureClient::new(
        Platform::Twitter,
        vec![cost_complaint_signal(Platform::Twitter, "@builder", "for real", 30, 6)],
    )));

    let (pipeline, store) = build_pipeline(registry).await;

    let opportunities = pipeline
        .run_cycle(QuerySpec::new(50), Utc::now() - chrono::Duration::days(14), CancellationToken::new())
        .await;

    assert!(!opportunities.is_empty(), "three corroborating cost complaints should fuse into at least one opportunity");

    let persisted = store
        .recent_opportunities(10, CancellationToken::new())
        .await
        .expect("recent_opportunities should succeed against the freshly-migrated store");
    assert!(
        opportunities
            .iter()
            .all(|o| persisted.iter().any(|p| p.opportunity_id == o.opportunity_id)),
        "every opportunity run_cycle returned must also be durably persisted"
    );
}

#[tokio::test]
async fn two_cycles_over_the_same_signals_regenerate_the_same_opportunity_id() {
    let mut registry = ClientRegistry::new();
    registry.register(Arc::new(FixtureClient::new(
        Platform::Reddit,
        vec![cost_complaint_signal(Platform::Reddit, "u/founder_b", "ugh", 25, 8)],
    )));
    registry.register(Arc::new(FixtureClient::new(
        Platform::DevTo,
        vec![cost_complaint_signal(Platform::DevTo, "devto_writer", "yep", 19, 5)],
    )));

    let (pipeline, _store) = build_pipeline(registry).await;
    let since = Utc::now() - chrono::Duration::days(14);

    let first = pipeline.run_cycle(QuerySpec::new(50), since, CancellationToken::new()).await;
    let second = pipeline.run_cycle(QuerySpec::new(50), since, CancellationToken::new()).await;

    assert!(!first.is_empty() && !second.is_empty());
    let first_ids: Vec<Uuid> = first.iter().map(|o| o.opportunity_id).collect();
    let second_ids: Vec<Uuid> = second.iter().map(|o| o.opportunity_id).collect();
    assert_eq!(first_ids, second_ids, "content-derived opportunity ids must be idempotent across cycles");
}

#[tokio::test]
async fn unregistered_platforms_yield_no_opportunities_without_erroring() {
    let (pipeline, store) = build_pipeline(ClientRegistry::new()).await;

    let opportunities = pipeline
        .run_cycle(QuerySpec::new(50), Utc::now() - chrono::Duration::days(14), CancellationToken::new())
        .await;
    assert!(opportunities.is_empty());

    let persisted = store.recent_opportunities(10, CancellationToken::new()).await.unwrap();
    assert!(persisted.is_empty());
}
