//! Shared, read-only dependencies handed to every node for the duration
//! of one request (§5 Concurrency & Resource Model).

use std::sync::Arc;

use scholarly_config::RequestConfig;
use scholarly_events::EventSender;
use scholarly_providers::ProviderRegistry;
use scholarly_tools::ToolRegistry;

/// Everything a graph node needs besides the mutable `AgentState`. Built
/// once per request; the registries it borrows from are process-wide
/// singletons (§5: "no shared mutable state between [requests] except
/// the read-mostly tool registry").
pub struct ExecutionContext {
    pub request_id: uuid::Uuid,
    pub providers: Arc<ProviderRegistry>,
    pub tools: Arc<ToolRegistry>,
    pub config: RequestConfig,
    pub events: EventSender,
}

impl ExecutionContext {
    #[must_use]
    pub fn provider_name(&self) -> Option<&str> {
        self.config.provider.as_deref()
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        self.config.model.as_deref().unwrap_or("default")
    }
}
