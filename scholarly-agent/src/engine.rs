//! Execution engine (§4.F): the bounded state machine stepping over nodes.
//!
//! Grounded on the teacher's `llmspell-agents/src/lifecycle/state_machine.rs`:
//! an explicit `state -> (state', guard)` transition table rather than
//! mutually recursive node calls, so the iteration and retrieval caps are
//! inspectable in tests (§9 Design Notes: "this makes the iteration and
//! retrieval caps inspectable in tests").

use scholarly_core::error::Result;

use crate::context::ExecutionContext;
use crate::nodes::{
    ExecutorNode, GeneratorNode, GraderNode, GraphNode, GuardrailNode, OutOfScopeNode,
    RewriterNode, RouterNode,
};
use crate::state::AgentState;

/// One node of the execution graph (§4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphState {
    Guardrail,
    Router,
    Executor,
    Grader,
    Rewriter,
    Generator,
    OutOfScope,
}

impl GraphState {
    fn is_terminal(self) -> bool {
        matches!(self, GraphState::Generator | GraphState::OutOfScope)
    }
}

/// Drives one request's `AgentState` through the graph (§4.F) to a
/// terminal node, enforcing `max_iterations` and `max_retrieval_attempts`
/// as hard caps. Stateless and reusable across requests; all per-request
/// state lives in `AgentState` and `ExecutionContext`.
pub struct ExecutionEngine {
    guardrail: GuardrailNode,
    router: RouterNode,
    executor: ExecutorNode,
    grader: GraderNode,
    rewriter: RewriterNode,
    generator: GeneratorNode,
    out_of_scope: OutOfScopeNode,
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            guardrail: GuardrailNode,
            router: RouterNode,
            executor: ExecutorNode,
            grader: GraderNode,
            rewriter: RewriterNode,
            generator: GeneratorNode,
            out_of_scope: OutOfScopeNode,
        }
    }

    /// Runs `state` through the graph until it reaches `GENERATOR` or
    /// `OUT_OF_SCOPE` (§4.F: "`GENERATOR` and `OUT_OF_SCOPE` are
    /// terminal"), returning the terminal state. Propagates
    /// `Error::Cancelled` the moment a node's event emission observes the
    /// transport has disconnected (§4.G, §5 Cancellation); no further
    /// nodes run and the caller persists nothing.
    pub async fn run(&self, mut state: AgentState, ctx: &ExecutionContext) -> Result<AgentState> {
        let mut graph_state = GraphState::Guardrail;
        loop {
            state = self.dispatch(graph_state, state, ctx).await?;
            if graph_state.is_terminal() {
                return Ok(state);
            }
            graph_state = self.transition(graph_state, &mut state, ctx);
        }
    }

    async fn dispatch(
        &self,
        graph_state: GraphState,
        state: AgentState,
        ctx: &ExecutionContext,
    ) -> Result<AgentState> {
        match graph_state {
            GraphState::Guardrail => self.guardrail.run(state, ctx).await,
            GraphState::Router => self.router.run(state, ctx).await,
            GraphState::Executor => self.executor.run(state, ctx).await,
            GraphState::Grader => self.grader.run(state, ctx).await,
            GraphState::Rewriter => self.rewriter.run(state, ctx).await,
            GraphState::Generator => self.generator.run(state, ctx).await,
            GraphState::OutOfScope => self.out_of_scope.run(state, ctx).await,
        }
    }

    /// The explicit `state -> state'` transition table (§4.F "Transition
    /// rules"). Mutates the iteration/retrieval counters that belong to the
    /// transition itself rather than to any one node's output.
    fn transition(
        &self,
        current: GraphState,
        state: &mut AgentState,
        ctx: &ExecutionContext,
    ) -> GraphState {
        match current {
            GraphState::Guardrail => {
                let in_scope = state
                    .guardrail_result
                    .as_ref()
                    .map_or(true, |g| g.in_scope);
                if in_scope {
                    GraphState::Router
                } else {
                    GraphState::OutOfScope
                }
            }
            GraphState::Router => {
                let decision = state
                    .router_decision
                    .clone()
                    .expect("router always sets a decision before returning");
                if decision.should_generate || state.iteration >= ctx.config.max_iterations {
                    GraphState::Generator
                } else {
                    state.iteration += 1;
                    GraphState::Executor
                }
            }
            GraphState::Executor => {
                let last = state
                    .tool_history
                    .last()
                    .expect("executor always appends exactly one entry");
                if last.tool_name == "retrieve_chunks" && last.success {
                    GraphState::Grader
                } else {
                    GraphState::Router
                }
            }
            GraphState::Grader => {
                let insufficient = state.graded_relevant_count() < ctx.config.top_k;
                if insufficient && state.retrieval_attempts < ctx.config.max_retrieval_attempts {
                    GraphState::Rewriter
                } else {
                    GraphState::Router
                }
            }
            GraphState::Rewriter => GraphState::Router,
            GraphState::Generator | GraphState::OutOfScope => {
                unreachable!("terminal states never transition")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use scholarly_config::RequestConfig;
    use scholarly_core::traits::tool::{Tool, ToolCategory, ToolResult, ToolSchema};
    use scholarly_core::types::Message;
    use scholarly_events::{channel, Event};
    use scholarly_providers::{FakeProvider, ProviderRegistry};
    use scholarly_tools::ToolRegistry;
    use serde_json::{json, Value};

    use super::*;
    use crate::state::RunStatus;

    /// A `retrieve_chunks` stand-in returning one canned chunk every call,
    /// so grader/rewriter transitions are exercisable without a real index.
    struct StubRetrieve {
        relevant: bool,
    }

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
            let _ = self.relevant;
            ToolResult::ok(
                self.name(),
                json!({
                    "chunks": [{
                        "arxiv_id": "1706.03762",
                        "title": "Attention Is All You Need",
                        "authors": ["A. Vaswani"],
                        "chunk_index": 0,
                        "chunk_text": "the transformer architecture relies entirely on attention",
                        "score": 0.9
                    }],
                    "count": 1
                }),
            )
        }
    }

    /// A `retrieve_chunks` stand-in that always reports failure, for
    /// exercising the executor-failure fallback to `ROUTER` (§4.F, S6).
    struct FailingRetrieve;

    #[async_trait::async_trait]
    impl Tool for FailingRetrieve {
        fn name(&self) -> &str {
            "retrieve_chunks"
        }
        fn description(&self) -> &str {
            "always fails"
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
            ToolResult::failed(self.name(), "index unreachable")
        }
    }

    fn ctx_with_tools(config: RequestConfig) -> (ExecutionContext, Arc<FakeProvider>, scholarly_events::EventReceiver) {
        ctx_with_tool(config, Arc::new(StubRetrieve { relevant: true }))
    }

    fn ctx_with_tool(
        config: RequestConfig,
        tool: Arc<dyn Tool>,
    ) -> (ExecutionContext, Arc<FakeProvider>, scholarly_events::EventReceiver) {
        let provider = Arc::new(FakeProvider::new("fake"));
        let mut providers = ProviderRegistry::new();
        providers.register(provider.clone());
        providers.set_default("fake");

        let mut tools = ToolRegistry::new();
        tools.register(tool);

        let (tx, rx) = channel(64);
        let ctx = ExecutionContext {
            request_id: uuid::Uuid::new_v4(),
            providers: Arc::new(providers),
            tools: Arc::new(tools),
            config,
            events: tx,
        };
        (ctx, provider, rx)
    }

    async fn drain(mut rx: scholarly_events::EventReceiver) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        events
    }

    #[tokio::test]
    async fn out_of_scope_path_skips_retrieval() {
        let (ctx, provider, rx) = ctx_with_tools(RequestConfig::default());
        provider.push_structured("guardrail", json!({"score": 10, "reasoning": "off-topic"}));
        provider.push_text("We can only help with research papers.");

        let state = AgentState::new(ctx.request_id, "Best pizza in Naples?".into(), vec![]);
        let engine = ExecutionEngine::new();
        let result = engine.run(state, &ctx).await.unwrap();

        assert_eq!(result.status, Some(RunStatus::OutOfScope));
        assert!(result.tool_history.is_empty());
        drop(ctx);
        let events = drain(rx).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Status { step: scholarly_events::Step::OutOfScope, .. })));
        assert!(!events.iter().any(|e| matches!(e, Event::Sources { .. })));
    }

    #[tokio::test]
    async fn in_scope_single_retrieval_reaches_generation() {
        let mut config = RequestConfig::default();
        config.top_k = 1; // the stub yields exactly one chunk; grading it relevant must satisfy top_k
        let (ctx, provider, rx) = ctx_with_tools(config);
        provider.push_structured("guardrail", json!({"score": 90, "reasoning": "on-topic"}));
        provider.push_structured(
            "router",
            json!({"next_tool": "retrieve_chunks", "tool_args": {}, "rationale": "need chunks", "should_generate": false}),
        );
        provider.push_structured(
            "grader",
            json!({"results": [{"relevant": true, "reason": "on point"}]}),
        );
        provider.push_structured(
            "router",
            json!({"rationale": "enough evidence", "should_generate": true}),
        );
        provider.push_text("Attention lets transformers weigh context [1706.03762].");

        let state = AgentState::new(
            ctx.request_id,
            "What is attention in transformers?".into(),
            vec![],
        );
        let engine = ExecutionEngine::new();
        let result = engine.run(state, &ctx).await.unwrap();

        assert_eq!(result.status, Some(RunStatus::Generated));
        assert_eq!(result.iteration, 1);
        assert_eq!(result.retrieval_attempts, 1);
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].arxiv_id, "1706.03762");
        assert!(result
            .final_answer
            .as_deref()
            .unwrap()
            .contains("1706.03762"));

        drop(ctx);
        let events = drain(rx).await;
        let sources_idx = events
            .iter()
            .position(|e| matches!(e, Event::Sources { .. }))
            .unwrap();
        let first_content_idx = events
            .iter()
            .position(|e| matches!(e, Event::Content { .. }))
            .unwrap();
        assert!(sources_idx < first_content_idx, "Sources precedes first Content (§8 property 2)");
    }

    #[tokio::test]
    async fn insufficient_grading_triggers_rewrite_then_retries() {
        let mut config = RequestConfig::default();
        config.top_k = 3; // require 3 relevant chunks, grader gives 1, forcing a rewrite
        let (ctx, provider, _rx) = ctx_with_tools(config);

        provider.push_structured("guardrail", json!({"score": 90, "reasoning": "on-topic"}));
        provider.push_structured(
            "router",
            json!({"next_tool": "retrieve_chunks", "tool_args": {}, "rationale": "search", "should_generate": false}),
        );
        provider.push_structured(
            "grader",
            json!({"results": [{"relevant": false, "reason": "off point"}]}),
        );
        provider.push_structured(
            "rewriter",
            json!({"rewritten_query": "attention mechanism transformers", "reason": "broaden recall"}),
        );
        provider.push_structured(
            "router",
            json!({"rationale": "give up, generate now", "should_generate": true}),
        );
        provider.push_text("Here is what I found.");

        let state = AgentState::new(ctx.request_id, "attention?".into(), vec![]);
        let engine = ExecutionEngine::new();
        let result = engine.run(state, &ctx).await.unwrap();

        assert_eq!(result.retrieval_attempts, 1);
        assert_eq!(result.current_query, "attention mechanism transformers");
        assert_eq!(result.status, Some(RunStatus::Generated));
    }

    #[tokio::test]
    async fn router_forced_to_generate_at_iteration_cap() {
        let mut config = RequestConfig::default();
        config.max_iterations = 1;
        config.top_k = 1; // the stub yields exactly one chunk; grading it relevant must satisfy top_k
        let (ctx, provider, _rx) = ctx_with_tools(config);

        provider.push_structured("guardrail", json!({"score": 90, "reasoning": "on-topic"}));
        // router never says should_generate=true, but the cap forces it
        // after the one permitted iteration.
        provider.push_structured(
            "router",
            json!({"next_tool": "retrieve_chunks", "tool_args": {}, "rationale": "search", "should_generate": false}),
        );
        provider.push_structured(
            "grader",
            json!({"results": [{"relevant": true, "reason": "good"}]}),
        );
        provider.push_structured(
            "router",
            json!({"next_tool": "retrieve_chunks", "tool_args": {}, "rationale": "search again", "should_generate": false}),
        );
        provider.push_text("Final answer despite the cap.");

        let state = AgentState::new(ctx.request_id, "attention?".into(), vec![]);
        let engine = ExecutionEngine::new();
        let result = engine.run(state, &ctx).await.unwrap();

        assert!(result.iteration <= 1, "iteration never exceeds max_iterations (§8 property 3)");
        assert_eq!(result.status, Some(RunStatus::Generated));
    }

    #[tokio::test]
    async fn tool_failure_falls_back_to_router_then_generates() {
        let mut config = RequestConfig::default();
        config.max_iterations = 1;
        let (ctx, provider, _rx) = ctx_with_tool(config, Arc::new(FailingRetrieve));

        provider.push_structured("guardrail", json!({"score": 90, "reasoning": "on-topic"}));
        provider.push_structured(
            "router",
            json!({"next_tool": "retrieve_chunks", "tool_args": {}, "rationale": "search", "should_generate": false}),
        );
        // The iteration cap forces GENERATOR on the next ROUTER visit;
        // no grader call is ever queued because the failed tool call
        // routes straight back to ROUTER, skipping GRADER entirely (S6).
        provider.push_text("Answering without retrieved evidence.");

        let state = AgentState::new(ctx.request_id, "attention?".into(), vec![]);
        let engine = ExecutionEngine::new();
        let result = engine.run(state, &ctx).await.unwrap();

        assert_eq!(result.status, Some(RunStatus::Generated));
        assert!(result.relevant_chunks.is_empty());
        assert!(!result.tool_history.last().unwrap().success);
        assert!(result
            .reasoning_steps
            .iter()
            .any(|step| step.contains("retrieve_chunks") && step.contains("failed")));
    }

    #[tokio::test]
    async fn cancellation_propagates_as_error_without_panicking() {
        let (ctx, provider, rx) = ctx_with_tools(RequestConfig::default());
        provider.push_structured("guardrail", json!({"score": 10, "reasoning": "off-topic"}));
        drop(rx); // consumer gone before the engine emits anything

        let state = AgentState::new(ctx.request_id, "irrelevant query".into(), vec![]);
        let engine = ExecutionEngine::new();
        let err = engine.run(state, &ctx).await.unwrap_err();
        assert_eq!(err.code(), "cancelled");
    }

    #[tokio::test]
    async fn conversation_history_flows_through_unmodified() {
        let (ctx, provider, _rx) = ctx_with_tools(RequestConfig::default());
        provider.push_structured("guardrail", json!({"score": 10, "reasoning": "off-topic"}));
        provider.push_text("redirecting");

        let history = vec![Message::user("Tell me about BERT."), Message::assistant("BERT is...")];
        let state = AgentState::new(ctx.request_id, "pizza?".into(), history.clone());
        let engine = ExecutionEngine::new();
        let result = engine.run(state, &ctx).await.unwrap();
        assert_eq!(result.conversation_history.len(), history.len());
    }
}
