//! # Demo Host
//!
//! A minimal axum surface around the intelligence pipeline for local
//! exploration: health/readiness, recent opportunities, and one
//! conversational endpoint. HTTP transport is explicitly out of scope for
//! the core (spec §1), so this stays a thin host rather than growing into a
//! full CRUD/auth API — see `DESIGN.md` open-question decision 5.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db;
use crate::engines::conversation::{ConversationConfidence, ConversationOrchestrator, IntelligenceRef, LLMProvider};
use crate::error::AppError;
use crate::models::{OpportunityResponse, ServiceInfo};
use crate::repositories::opportunity::OpportunityRepository;

/// Application state shared across handlers. Generic over the configured
/// LLM provider so the demo host can run with either a real adapter or the
/// rule-based fallback without a trait object at every call site.
pub struct AppState<P: LLMProvider + 'static> {
    pub db: DatabaseConnection,
    pub conversation: Arc<ConversationOrchestrator<P>>,
}

impl<P: LLMProvider + 'static> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            conversation: Arc::clone(&self.conversation),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecentOpportunitiesQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: u64,
}

fn default_recent_limit() -> u64 {
    20
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ConversationTurnRequest {
    pub conversation_id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl From<ConversationConfidence> for ConfidenceLevel {
    fn from(value: ConversationConfidence) -> Self {
        match value {
            ConversationConfidence::Low => ConfidenceLevel::Low,
            ConversationConfidence::Medium => ConfidenceLevel::Medium,
            ConversationConfidence::High => ConfidenceLevel::High,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationTurnResponse {
    pub assistant_text: String,
    pub opportunity_refs: Vec<Uuid>,
    pub signal_refs: Vec<Uuid>,
    pub confidence: ConfidenceLevel,
}

/// `GET /healthz` — process liveness; never touches the database.
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// `GET /readyz` — confirms the database connection is actually usable.
pub async fn readyz<P: LLMProvider + 'static>(
    State(state): State<AppState<P>>,
) -> Result<Json<HealthResponse>, AppError> {
    db::health_check(&state.db).await?;
    Ok(Json(HealthResponse { status: "ready" }))
}

/// `GET /` — service identity.
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// `GET /opportunities?limit=` — most recent fusion output (C8 via C10).
pub async fn recent_opportunities<P: LLMProvider + 'static>(
    State(state): State<AppState<P>>,
    Query(params): Query<RecentOpportunitiesQuery>,
) -> Result<Json<Vec<OpportunityResponse>>, AppError> {
    let repo = OpportunityRepository::new(&state.db);
    let rows = repo
        .recent(params.limit)
        .await
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(Json(rows.into_iter().map(OpportunityResponse::from).collect()))
}

/// `POST /conversation/turn` — one C9 turn (spec §4.9).
pub async fn conversation_turn<P: LLMProvider + 'static>(
    State(state): State<AppState<P>>,
    Json(request): Json<ConversationTurnRequest>,
) -> Result<Json<ConversationTurnResponse>, AppError> {
    let turn = state
        .conversation
        .handle_turn(request.conversation_id, request.message, CancellationToken::new())
        .await?;

    let mut opportunity_refs = Vec::new();
    let mut signal_refs = Vec::new();
    for reference in turn.intelligence_refs {
        match reference {
            IntelligenceRef::Opportunity(id) => opportunity_refs.push(id),
            IntelligenceRef::Signal(id) => signal_refs.push(id),
        }
    }

    Ok(Json(ConversationTurnResponse {
        assistant_text: turn.assistant_text,
        opportunity_refs,
        signal_refs,
        confidence: turn.confidence.into(),
    }))
}

/// Creates and configures the Axum application router.
pub fn create_app<P: LLMProvider + 'static>(state: AppState<P>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz::<P>))
        .route("/opportunities", get(recent_opportunities::<P>))
        .route("/conversation/turn", post(conversation_turn::<P>))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

/// Starts the server with the given configuration.
pub async fn run_server<P: LLMProvider + 'static>(
    config: AppConfig,
    state: AppState<P>,
) -> anyhow::Result<()> {
    let app = create_app(state);

    let addr = config.bind_addr().map_err(|e| anyhow::anyhow!("invalid server address: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    paths(root, healthz,),
    components(schemas(ServiceInfo, HealthResponse,)),
    info(
        title = "Luciq Intelligence Pipeline",
        description = "Demo host for the signal ingestion, scoring, and fusion pipeline",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
