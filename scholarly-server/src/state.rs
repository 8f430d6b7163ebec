//! Process-wide application state shared across handlers (§5 Resource
//! policy: providers, tools, and the store are process-wide singletons
//! reused across requests).

use std::sync::Arc;

use scholarly_agent::AgentService;
use scholarly_config::ProcessConfig;
use scholarly_store::ConversationStore;

#[derive(Clone)]
pub struct AppState {
    pub agent: AgentService,
    pub store: Arc<dyn ConversationStore>,
    pub config: Arc<ProcessConfig>,
}
