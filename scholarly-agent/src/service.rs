//! Agent service (§4.I): per-request orchestration tying history load,
//! engine execution, and turn persistence together.
//!
//! Grounded on the teacher's `llmspell-agents/src/config.rs` request-scoped
//! config pattern; the split between a stateless `ExecutionEngine` (§4.F)
//! and the service that drives and persists around it mirrors the
//! teacher's separation of `AgentStateMachine` from its owning `Agent`.

use std::sync::Arc;
use std::time::Instant;

use scholarly_config::RequestConfig;
use scholarly_core::error::{Error, Result};
use scholarly_core::types::{ConversationTurn, Message, TurnData};
use scholarly_events::channel::DEFAULT_CAPACITY;
use scholarly_events::{channel, Event, EventReceiver, Metadata};
use scholarly_providers::ProviderRegistry;
use scholarly_store::ConversationStore;
use scholarly_tools::ToolRegistry;
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::engine::ExecutionEngine;
use crate::state::{AgentState, RunStatus};

/// One `ask` call's input (§4.I, §6 `POST /stream` body).
#[derive(Debug, Clone)]
pub struct AskRequest {
    pub query: String,
    pub session_id: Option<String>,
    pub config: RequestConfig,
}

/// Returned synchronously from `ask`, before the run completes, so callers
/// have a correlation id without awaiting the stream (§4.I: "ask(...) ->
/// (event stream, response summary)").
#[derive(Debug, Clone)]
pub struct AskSummary {
    pub request_id: Uuid,
    pub session_id: Option<String>,
    pub provider: String,
    pub model: String,
}

/// Per-request orchestration (§4.I). Holds only read-mostly, process-wide
/// singletons (§5: "no shared mutable state between [requests] except the
/// read-mostly tool registry [and] the conversation store"); cheap to
/// clone and safe to share across concurrently running requests.
#[derive(Clone)]
pub struct AgentService {
    providers: Arc<ProviderRegistry>,
    tools: Arc<ToolRegistry>,
    store: Arc<dyn ConversationStore>,
    engine: Arc<ExecutionEngine>,
}

impl AgentService {
    #[must_use]
    pub fn new(
        providers: Arc<ProviderRegistry>,
        tools: Arc<ToolRegistry>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            providers,
            tools,
            store,
            engine: Arc::new(ExecutionEngine::new()),
        }
    }

    /// Validates `request`, loads prior-turn history if `session_id` is
    /// present, then spawns the engine run as an independent task and
    /// returns immediately with the event stream (§4.I Sequence steps
    /// 1-4). The spawned task persists the turn and emits the closing
    /// `Metadata`/`Done` pair once the engine reaches a terminal state
    /// (steps 5-6).
    pub async fn ask(&self, request: AskRequest) -> Result<(EventReceiver, AskSummary)> {
        if request.query.trim().is_empty() {
            return Err(Error::Validation("query must not be empty".to_string()));
        }
        request.config.validate()?;

        // Resolve the provider up front so a misconfigured/unknown
        // provider is a synchronous validation-style failure rather than
        // one discovered deep inside the guardrail node (§4.I step 1).
        let provider = self.providers.resolve(request.config.provider.as_deref())?;
        let provider_name = provider.name().to_string();
        let model_name = request
            .config
            .model
            .clone()
            .unwrap_or_else(|| "default".to_string());

        let request_id = Uuid::new_v4();
        let history = match &request.session_id {
            Some(session_id) => {
                self.store.get_or_create(session_id).await?;
                let turns = self
                    .store
                    .get_history(session_id, request.config.conversation_window)
                    .await?;
                flatten_history(&turns)
            }
            None => Vec::new(),
        };

        let (tx, rx) = channel(DEFAULT_CAPACITY);
        let state = AgentState::new(request_id, request.query.clone(), history);
        let ctx = ExecutionContext {
            request_id,
            providers: self.providers.clone(),
            tools: self.tools.clone(),
            config: request.config.clone(),
            events: tx,
        };

        let summary = AskSummary {
            request_id,
            session_id: request.session_id.clone(),
            provider: provider_name.clone(),
            model: model_name.clone(),
        };

        let engine = self.engine.clone();
        let store = self.store.clone();
        let session_id = request.session_id.clone();
        let span = info_span!("ask", request_id = %request_id, session_id = session_id.as_deref());
        tokio::spawn(
            async move {
                run_and_persist(engine, store, session_id, provider_name, model_name, state, ctx)
                    .await;
            }
            .instrument(span),
        );

        Ok((rx, summary))
    }
}

/// Flattens persisted turns into alternating user/assistant messages,
/// chronological oldest-first (§4.I step 2, §8 property 4).
fn flatten_history(turns: &[ConversationTurn]) -> Vec<Message> {
    let mut messages = Vec::with_capacity(turns.len() * 2);
    for turn in turns {
        messages.push(Message::user(turn.user_query.clone()));
        messages.push(Message::assistant(turn.agent_response.clone()));
    }
    messages
}

async fn run_and_persist(
    engine: Arc<ExecutionEngine>,
    store: Arc<dyn ConversationStore>,
    session_id: Option<String>,
    provider_name: String,
    model_name: String,
    state: AgentState,
    ctx: ExecutionContext,
) {
    let started_at = Instant::now();
    let events = ctx.events.clone();

    let final_state = match engine.run(state, &ctx).await {
        Ok(state) => state,
        Err(e) => {
            // Cancellation: the channel is already closed, so there is
            // nothing left to emit and no turn is persisted (§5
            // Cancellation: "a terminal Error{code:\"cancelled\"} is *not*
            // emitted"). Any other propagated error is unexpected — a node
            // bug, not a modeled failure mode — so it is logged but still
            // results in silent termination rather than a panic.
            if e.code() != "cancelled" {
                error!(error = %e, "engine run ended with an unmodeled error");
            }
            return;
        }
    };

    let execution_time_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

    if final_state.status == Some(RunStatus::Failed) {
        // Generator/out-of-scope failures already emitted `Error`; no turn
        // is persisted and no `Metadata` follows it (§4.F, §7 Provider
        // errors: "the stream emits error then done, no turn persisted").
        let _ = events.send(Event::Done).await;
        return;
    }

    let mut turn_number: i32 = 0;
    let mut persistence_error = None;

    if let Some(session_id) = &session_id {
        let turn_data = TurnData {
            user_query: final_state.original_query.clone(),
            agent_response: final_state.final_answer.clone().unwrap_or_default(),
            provider: provider_name.clone(),
            model: model_name.clone(),
            guardrail_score: final_state.guardrail_result.as_ref().map(|g| g.score),
            retrieval_attempts: final_state.retrieval_attempts as i32,
            rewritten_query: final_state.rewritten_query(),
            sources: (!final_state.sources.is_empty()).then(|| final_state.sources.clone()),
            reasoning_steps: (!final_state.reasoning_steps.is_empty())
                .then(|| final_state.reasoning_steps.clone()),
        };
        match store.save_turn(session_id, turn_data).await {
            Ok(saved) => turn_number = saved.turn_number,
            Err(e) => {
                // The answer already streamed; the turn just failed to
                // commit. `turn_number = -1` signals "not persisted" to
                // the caller, who can safely reissue with the same
                // session_id (§7 Persistence errors).
                turn_number = -1;
                persistence_error = Some(e.to_string());
            }
        }
    }

    let metadata = Metadata {
        session_id,
        turn_number,
        execution_time_ms,
        retrieval_attempts: final_state.retrieval_attempts as i32,
        rewritten_query: final_state.rewritten_query(),
        guardrail_score: final_state.guardrail_result.as_ref().map(|g| g.score),
        provider: provider_name,
        model: model_name,
        reasoning_steps: final_state.reasoning_steps.clone(),
        error: persistence_error,
    };
    let _ = events.send(Event::Metadata(metadata)).await;
    let _ = events.send(Event::Done).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scholarly_core::traits::tool::{Tool, ToolCategory, ToolResult, ToolSchema};
    use scholarly_providers::FakeProvider;
    use scholarly_store::InMemoryConversationStore;
    use scholarly_tools::ToolRegistry;
    use serde_json::{json, Value};

    use super::*;

    struct StubRetrieve;

    #[async_trait::async_trait]
    impl Tool for StubRetrieve {
        fn name(&self) -> &str {
            "retrieve_chunks"
        }
        fn description(&self) -> &str {
            "stub"
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::Retrieval
        }
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                parameters: json!({}),
                required: vec![],
            }
        }
        async fn invoke(&self, _args: Value) -> ToolResult {
            ToolResult::ok(
                self.name(),
                json!({
                    "chunks": [{
                        "arxiv_id": "1706.03762",
                        "title": "Attention Is All You Need",
                        "chunk_index": 0,
                        "chunk_text": "attention lets transformers weigh context",
                        "score": 0.9
                    }],
                    "count": 1
                }),
            )
        }
    }

    fn service_with_fake() -> (AgentService, Arc<FakeProvider>) {
        let provider = Arc::new(FakeProvider::new("fake"));
        let mut providers = ProviderRegistry::new();
        providers.register(provider.clone());
        providers.set_default("fake");

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(StubRetrieve));

        let store = Arc::new(InMemoryConversationStore::new());
        (
            AgentService::new(Arc::new(providers), Arc::new(tools), store),
            provider,
        )
    }

    async fn drain(mut rx: EventReceiver) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        events
    }

    #[tokio::test]
    async fn empty_query_is_rejected_before_spawning() {
        let (service, _provider) = service_with_fake();
        let err = service
            .ask(AskRequest {
                query: "   ".to_string(),
                session_id: None,
                config: RequestConfig::default(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[tokio::test]
    async fn out_of_scope_without_session_emits_turn_number_zero_and_no_sources() {
        let (service, provider) = service_with_fake();
        provider.push_structured("guardrail", json!({"score": 5, "reasoning": "off-topic"}));
        provider.push_text("I can only help with research papers.");

        let (rx, summary) = service
            .ask(AskRequest {
                query: "Best pizza in Naples?".to_string(),
                session_id: None,
                config: RequestConfig::default(),
            })
            .await
            .unwrap();
        assert_eq!(summary.provider, "fake");

        let events = drain(rx).await;
        assert!(!events.iter().any(|e| matches!(e, Event::Sources { .. })));
        let metadata = events
            .iter()
            .find_map(|e| match e {
                Event::Metadata(m) => Some(m),
                _ => None,
            })
            .expect("metadata is always emitted on a non-failed run");
        assert_eq!(metadata.turn_number, 0);
        assert!(metadata.session_id.is_none());
        assert!(matches!(events.last(), Some(Event::Done)));
    }

    #[tokio::test]
    async fn session_turn_is_persisted_and_retrievable() {
        let (service, provider) = service_with_fake();
        let mut config = RequestConfig::default();
        config.top_k = 1;

        provider.push_structured("guardrail", json!({"score": 90, "reasoning": "on-topic"}));
        provider.push_structured(
            "router",
            json!({"next_tool": "retrieve_chunks", "tool_args": {}, "rationale": "search", "should_generate": false}),
        );
        provider.push_structured(
            "grader",
            json!({"results": [{"relevant": true, "reason": "on point"}]}),
        );
        provider.push_structured(
            "router",
            json!({"rationale": "done", "should_generate": true}),
        );
        provider.push_text("Attention lets transformers weigh context [1706.03762].");

        let (rx, _summary) = service
            .ask(AskRequest {
                query: "What is attention?".to_string(),
                session_id: Some("s1".to_string()),
                config,
            })
            .await
            .unwrap();
        let events = drain(rx).await;
        let metadata = events
            .iter()
            .find_map(|e| match e {
                Event::Metadata(m) => Some(m),
                _ => None,
            })
            .unwrap();
        assert_eq!(metadata.turn_number, 0);
        assert_eq!(metadata.session_id.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn unknown_provider_is_rejected_synchronously() {
        let (service, _provider) = service_with_fake();
        let err = service
            .ask(AskRequest {
                query: "hi".to_string(),
                session_id: None,
                config: RequestConfig {
                    provider: Some("nonexistent".to_string()),
                    ..RequestConfig::default()
                },
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "provider_error");
    }
}
