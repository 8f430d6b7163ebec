//! Process-wide tool registry (§4.B).
//!
//! Grounded on the teacher's `llmspell-agents/src/tool_manager.rs`:
//! registration is push-only and happens before the engine is built;
//! lookup by name is O(1) thereafter.

use std::collections::HashMap;
use std::sync::Arc;

use scholarly_core::error::{Error, Result};
use scholarly_core::traits::tool::Tool;

/// Name-addressable registry of tools. Built once at startup and shared
/// read-only across all requests (§5 Concurrency & Resource Model).
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Must occur before the registry is handed to the
    /// execution engine (§4.B: "Registration is push-only and must occur
    /// before engine construction").
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    /// All registered tools, in registration order is not guaranteed;
    /// callers that need a stable prompt ordering should sort by name.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}
