//! # Luciq Intelligence Pipeline — demo entry point
//!
//! Boots configuration, telemetry, the database pool, the eight platform
//! clients, and the fusion pipeline, then runs either one ingest-to-rank
//! cycle or the thin demo HTTP host, depending on the subcommand.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use luciq_core::config::ConfigLoader;
use luciq_core::connectors::{
    AdapterConfig, ClientRegistry, DevToClient, GitHubClient, HackerNewsClient, IndieHackersClient, PlatformClient,
    ProductHuntClient, QuerySpec, RedditClient, StackOverflowClient, TwitterClient,
};
use luciq_core::db;
use luciq_core::engines::conversation::{ConversationOrchestrator, OpenAiCompatibleProvider, RuleBasedLlmProvider};
use luciq_core::engines::credibility::CredibilityEngine;
use luciq_core::engines::semantic::LexicalFallbackProvider;
use luciq_core::models::signal::Platform;
use luciq_core::pipeline::IntelligencePipeline;
use luciq_core::seeds::seed_platform_credibility;
use luciq_core::server::{self, AppState};
use luciq_core::store::SeaOrmStore;
use migration::{Migrator, MigratorTrait};

#[derive(Parser)]
#[command(name = "luciq")]
#[command(about = "Luciq intelligence pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Run one fetch-to-opportunities cycle and exit
    RunCycle,
    /// Run the demo HTTP host (health, recent opportunities, conversation turn)
    Serve,
}

#[derive(Subcommand)]
enum MigrateAction {
    Up,
    Down,
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new().load()?;
    luciq_core::telemetry::init_tracing(&config)?;

    let db = db::init_pool(&config).await?;

    if config.profile == "local" || config.profile == "test" {
        Migrator::up(&db, None).await?;
    }
    seed_platform_credibility(&db).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate { action } => run_migrate(&db, action).await,
        Commands::RunCycle => run_cycle(config, db).await,
        Commands::Serve => serve(config, db).await,
    }
}

async fn run_migrate(db: &sea_orm::DatabaseConnection, action: MigrateAction) -> anyhow::Result<()> {
    match action {
        MigrateAction::Up => {
            Migrator::up(db, None).await?;
            tracing::info!("migrations applied");
        }
        MigrateAction::Down => {
            Migrator::down(db, Some(1)).await?;
            tracing::info!("last migration rolled back");
        }
        MigrateAction::Status => {
            let applied = Migrator::get_applied_migrations(db).await?;
            let pending = Migrator::get_pending_migrations(db).await?;
            tracing::info!(applied = applied.len(), pending = pending.len(), "migration status");
        }
    }
    Ok(())
}

/// Registers every platform client with the credentials-optional default
/// adapter config (spec §4.1: absent credentials fall back to public
/// endpoints rather than failing registration).
fn build_registry() -> ClientRegistry {
    let mut registry = ClientRegistry::new();
    let default_config = || AdapterConfig {
        user_agent: "luciq-intelligence-pipeline/0.1".to_string(),
        ..Default::default()
    };
    registry.register(Arc::new(RedditClient::new(default_config())) as Arc<dyn PlatformClient>);
    registry.register(Arc::new(HackerNewsClient::new(default_config())));
    registry.register(Arc::new(ProductHuntClient::new(default_config())));
    registry.register(Arc::new(GitHubClient::new(default_config())));
    registry.register(Arc::new(StackOverflowClient::new(default_config())));
    registry.register(Arc::new(TwitterClient::new(default_config())));
    registry.register(Arc::new(DevToClient::new(default_config())));
    registry.register(Arc::new(IndieHackersClient::new(default_config())));
    registry
}

fn seed_overrides(config: &luciq_core::config::AppConfig) -> HashMap<Platform, f32> {
    config
        .credibility_seed_overrides
        .iter()
        .filter_map(|(slug, overall)| slug.parse::<Platform>().ok().map(|platform| (platform, *overall)))
        .collect()
}

async fn run_cycle(config: luciq_core::config::AppConfig, db: sea_orm::DatabaseConnection) -> anyhow::Result<()> {
    let credibility = CredibilityEngine::new(db.clone(), seed_overrides(&config));
    let store = Arc::new(SeaOrmStore::new(db, credibility.clone(), Duration::from_secs(config.store_timeout_s)));
    let pipeline = IntelligencePipeline::new(&config, build_registry(), credibility, LexicalFallbackProvider, store);

    let query = QuerySpec::new(200);
    let since = Utc::now() - chrono::Duration::days(14);
    let opportunities = pipeline.run_cycle(query, since, CancellationToken::new()).await;
    tracing::info!(count = opportunities.len(), "cycle produced opportunities");
    Ok(())
}

async fn serve(config: luciq_core::config::AppConfig, db: sea_orm::DatabaseConnection) -> anyhow::Result<()> {
    match std::env::var("LUCIQ_LLM_API_KEY") {
        Ok(api_key) if !api_key.is_empty() => {
            let provider = OpenAiCompatibleProvider::new(
                api_key,
                std::env::var("LUCIQ_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                config.llm_temperature,
                config.llm_max_tokens,
                Duration::from_secs(config.llm_timeout_s),
            );
            let conversation = Arc::new(
                ConversationOrchestrator::new(db.clone(), provider)
                    .with_max_turns_retained(config.conversation_max_turns_retained as u64),
            );
            server::run_server(config, AppState { db, conversation }).await
        }
        _ => {
            tracing::warn!("LUCIQ_LLM_API_KEY not set; conversational turns use the rule-based fallback");
            let conversation = Arc::new(
                ConversationOrchestrator::new(db.clone(), RuleBasedLlmProvider)
                    .with_max_turns_retained(config.conversation_max_turns_retained as u64),
            );
            server::run_server(config, AppState { db, conversation }).await
        }
    }
}
