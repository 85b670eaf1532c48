//! Conversational Orchestrator (C9): turns a user message into a grounded
//! reply by retrieving recent turn history and the most relevant ranked
//! opportunities, then invoking a pluggable [`LLMProvider`] — the same
//! capability-trait shape C4 uses for [`super::semantic::ModelProvider`],
//! now parameterized over LLM completion instead of embedding/classification.

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::lexical::{cosine_similarity, embed};
use crate::error::{Cancelled, LlmError};
use crate::models::conversation::{ConversationRole, ConversationTurn};
use crate::models::opportunity::{Model as OpportunityModel, OpportunityResponse};
use crate::repositories::conversation::ConversationRepository;
use crate::repositories::opportunity::OpportunityRepository;

const DEFAULT_HISTORY_TURNS: u64 = 10;
const DEFAULT_CONTEXT_OPPORTUNITIES: usize = 5;
const DEFAULT_MAX_TURNS_RETAINED: u64 = 10;
/// Candidate opportunities considered for relevance ranking per turn; bounds
/// the cost of the lexical re-rank against a store that may hold many more.
const CONTEXT_CANDIDATE_POOL: u64 = 50;

/// One turn's confidence band (spec §4.9 "one turn" contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationConfidence {
    Low,
    Medium,
    High,
}

/// An opportunity or signal the assistant's reply is grounded on, so a
/// caller can show its work rather than trust an unlinked summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntelligenceRef {
    Opportunity(Uuid),
    Signal(Uuid),
}

/// The full per-turn contract: `(assistant_text, intelligence_refs,
/// confidence)` (spec §4.9).
#[derive(Debug, Clone)]
pub struct TurnResponse {
    pub assistant_text: String,
    pub intelligence_refs: Vec<IntelligenceRef>,
    pub confidence: ConversationConfidence,
}

/// Capability every LLM-backed or rule-based provider implements (spec
/// §4.8/§6 "LLM Provider contract"). Must respect cooperative cancellation:
/// if `cancellation` fires, the call should abort and return
/// [`LlmError::Cancelled`] rather than complete late.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, prompt: &str, cancellation: CancellationToken) -> Result<String, LlmError>;
    fn is_fallback(&self) -> bool {
        false
    }
    /// Surfaced on the `llm_latency_ms{provider}` metric (spec §6 "Metrics
    /// surface").
    fn provider_name(&self) -> &'static str {
        "unknown"
    }
}

/// An OpenAI-compatible chat-completions adapter (spec §6 "LLM Provider
/// contract" names this as the reference implementation). Works against
/// OpenAI itself or any API-compatible endpoint by overriding `base_url`.
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleProvider {
    pub fn new(api_key: String, model: String, temperature: f32, max_tokens: u32, timeout: std::time::Duration) -> Self {
        Self {
            http: reqwest::Client::builder().timeout(timeout).build().unwrap_or_default(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key,
            model,
            temperature,
            max_tokens,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl LLMProvider for OpenAiCompatibleProvider {
    async fn complete(&self, prompt: &str, cancellation: CancellationToken) -> Result<String, LlmError> {
        if cancellation.is_cancelled() {
            return Err(LlmError::Cancelled(Cancelled));
        }

        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are Luciq's conversational analyst. Answer only from the supplied opportunities and turn history; say so plainly when nothing relevant is on file."},
                {"role": "user", "content": prompt}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let send = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send();

        let response = tokio::select! {
            _ = cancellation.cancelled() => return Err(LlmError::Cancelled(Cancelled)),
            result = send => result.map_err(|err| LlmError::Unavailable { reason: err.to_string() })?,
        };

        if !response.status().is_success() {
            return Err(LlmError::Unavailable {
                reason: format!("upstream returned status {}", response.status()),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|err| LlmError::Unavailable { reason: err.to_string() })?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::Unavailable {
                reason: "response contained no message content".to_string(),
            })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Deterministic, always-available fallback used when no LLM is configured
/// (spec §7 "LlmUnavailable" degrades to a rule-based reply rather than
/// failing the turn outright).
#[derive(Clone, Copy)]
pub struct RuleBasedLlmProvider;

#[async_trait]
impl LLMProvider for RuleBasedLlmProvider {
    async fn complete(&self, prompt: &str, cancellation: CancellationToken) -> Result<String, LlmError> {
        if cancellation.is_cancelled() {
            return Err(LlmError::Cancelled(Cancelled));
        }

        let user_line = prompt
            .lines()
            .rev()
            .find(|line| line.starts_with("User: "))
            .map(|line| line.trim_start_matches("User: "))
            .unwrap_or("");

        let has_context = prompt.contains("Relevant opportunities:");
        let reply = if has_context {
            format!(
                "Based on the opportunities on file, here's what's most relevant to \"{user_line}\". \
                 Ask me to go deeper on any one of them."
            )
        } else {
            format!("I don't have any opportunities matching \"{user_line}\" yet. Try broadening the query.")
        };
        Ok(reply)
    }

    fn is_fallback(&self) -> bool {
        true
    }
}

pub struct ConversationOrchestrator<P: LLMProvider> {
    db: DatabaseConnection,
    provider: P,
    history_turns: u64,
    context_opportunities: usize,
    max_turns_retained: u64,
}

impl<P: LLMProvider> ConversationOrchestrator<P> {
    pub fn new(db: DatabaseConnection, provider: P) -> Self {
        Self {
            db,
            provider,
            history_turns: DEFAULT_HISTORY_TURNS,
            context_opportunities: DEFAULT_CONTEXT_OPPORTUNITIES,
            max_turns_retained: DEFAULT_MAX_TURNS_RETAINED,
        }
    }

    /// Overrides the retention cap (spec §6 `conversation.max_turns_retained`);
    /// `new` defaults to [`DEFAULT_MAX_TURNS_RETAINED`] for callers that don't
    /// thread `AppConfig` through.
    pub fn with_max_turns_retained(mut self, max_turns_retained: u64) -> Self {
        self.max_turns_retained = max_turns_retained;
        self
    }

    fn build_prompt(history: &[ConversationTurn], context: &[OpportunityResponse], user_message: &str) -> String {
        let mut prompt = String::new();
        for turn in history {
            prompt.push_str(&format!("{:?}: {}\n", turn.role, turn.content));
        }
        if !context.is_empty() {
            prompt.push_str("Relevant opportunities:\n");
            for opportunity in context {
                prompt.push_str(&format!(
                    "- {} (score {:.2}): {}\n",
                    opportunity.title, opportunity.composite_score, opportunity.summary
                ));
            }
        }
        prompt.push_str(&format!("User: {user_message}\n"));
        prompt
    }

    /// Ranks candidate opportunities by lexical similarity of their
    /// title+summary against the user's message, taking the top N (spec
    /// §4.8 "context retrieval").
    fn relevant_context(&self, candidates: Vec<OpportunityModel>, user_message: &str) -> Vec<OpportunityModel> {
        let query_embedding = embed(user_message);
        let mut scored: Vec<(f32, OpportunityModel)> = candidates
            .into_iter()
            .map(|opportunity| {
                let text = format!("{} {}", opportunity.title, opportunity.summary);
                (cosine_similarity(&query_embedding, &embed(&text)), opportunity)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
        scored.into_iter().take(self.context_opportunities).map(|(_, opportunity)| opportunity).collect()
    }

    /// Handles one user turn end to end: retrieves memory and context,
    /// invokes the provider cooperatively-cancellable, and persists both the
    /// user and assistant turns only once the provider responds
    /// successfully — on cancellation or provider failure, memory is left
    /// unchanged (spec §4.8 "the orchestrator must abort the LLM call if
    /// possible and leave memory unchanged").
    pub async fn handle_turn(
        &self,
        conversation_id: Uuid,
        user_message: String,
        cancellation: CancellationToken,
    ) -> Result<TurnResponse, LlmError> {
        let conversation_repo = ConversationRepository::new(&self.db);
        let opportunity_repo = OpportunityRepository::new(&self.db);

        let history = conversation_repo
            .recent_turns(conversation_id, self.history_turns)
            .await
            .map(|rows| rows.into_iter().map(ConversationTurn::from).collect::<Vec<_>>())
            .unwrap_or_default();

        let candidates = opportunity_repo.recent(CONTEXT_CANDIDATE_POOL).await.unwrap_or_default();
        let relevant = self.relevant_context(candidates, &user_message);
        let context: Vec<OpportunityResponse> = relevant.iter().cloned().map(OpportunityResponse::from).collect();

        let prompt = Self::build_prompt(&history, &context, &user_message);

        let started = std::time::Instant::now();
        let response = tokio::select! {
            _ = cancellation.cancelled() => Err(LlmError::Cancelled(Cancelled)),
            result = self.provider.complete(&prompt, cancellation.clone()) => result,
        };
        metrics::histogram!("llm_latency_ms", "provider" => self.provider.provider_name())
            .record(started.elapsed().as_secs_f64() * 1000.0);
        let response = response?;

        conversation_repo.append_turn(conversation_id, ConversationRole::User, user_message).await.ok();
        conversation_repo.append_turn(conversation_id, ConversationRole::Assistant, response.clone()).await.ok();
        conversation_repo.enforce_retention(conversation_id, self.max_turns_retained).await.ok();

        let mut intelligence_refs: Vec<IntelligenceRef> = Vec::new();
        for opportunity in &relevant {
            intelligence_refs.push(IntelligenceRef::Opportunity(opportunity.opportunity_id));
            let signal_ids: Vec<Uuid> = serde_json::from_value(opportunity.supporting_signals.clone()).unwrap_or_default();
            intelligence_refs.extend(signal_ids.into_iter().map(IntelligenceRef::Signal));
        }

        // A fallback provider never had grounded context available to draw
        // on, so its replies are always flagged low confidence (spec §4.9,
        // scenario 5). A real provider grounded on retrieved opportunities
        // is high confidence; one with no matching context is medium.
        let confidence = if self.provider.is_fallback() {
            ConversationConfidence::Low
        } else if context.is_empty() {
            ConversationConfidence::Medium
        } else {
            ConversationConfidence::High
        };

        Ok(TurnResponse {
            assistant_text: response,
            intelligence_refs,
            confidence,
        })
    }
}
