//! ABOUTME: Uniform LLM provider contract (§4.J) plus a deterministic fake for tests
//! ABOUTME: Grounded on the teacher's llmspell-providers/src/abstraction.rs ProviderRegistry shape

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use scholarly_core::error::{Error, Result};
use scholarly_core::types::Message;
use serde_json::Value;

/// A provider's response to `complete`: either free text, or a structured
/// object for providers that support constrained decoding natively.
#[derive(Debug, Clone)]
pub enum Completion {
    Text(String),
    Structured(Value),
}

/// A boxed stream of completion tokens.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Uniform interface over LLM providers (§1 "LLM provider adapters",
/// §4.J). Provider/model selection is per-request; implementations are
/// process-wide singletons reused across requests (§5 Resource policy).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Adapter name, e.g. `"openai"`, `"anthropic"`.
    fn name(&self) -> &str;

    /// Whether this adapter can serve the given model string.
    fn supports_model(&self, model: &str) -> bool;

    /// Single-shot completion. When `schema_name` is `Some`, a provider
    /// that supports constrained decoding should return
    /// `Completion::Structured`; otherwise it returns `Completion::Text`
    /// and the caller parses/validates it (§9 Design Notes).
    async fn complete(
        &self,
        messages: &[Message],
        model: &str,
        temperature: f32,
        max_tokens: usize,
        schema_name: Option<&str>,
    ) -> Result<Completion>;

    /// Token-by-token streaming completion, used by the generator and
    /// out-of-scope nodes (§4.E).
    async fn stream(
        &self,
        messages: &[Message],
        model: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<TokenStream>;
}

/// Process-wide, read-only-after-startup registry of provider adapters
/// (§5 Resource policy: "LLM clients are shared, effectively stateless
/// adapters reused across requests").
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    default_provider: Option<String>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default_provider = Some(name.into());
    }

    /// Resolve a provider by name, falling back to the configured default
    /// (§3 Configuration: `provider?`: "which LLM adapter (fallback to
    /// default)").
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn LlmProvider>> {
        let key = name
            .map(str::to_string)
            .or_else(|| self.default_provider.clone())
            .ok_or_else(|| Error::Configuration("no default LLM provider configured".into()))?;
        self.providers
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::Provider {
                provider: key,
                message: "unknown provider".to_string(),
            })
    }
}

/// A deterministic, network-free provider used in tests (§9 Design Notes:
/// "tests that depend on specific LLM wording must fake the adapter").
///
/// Structured responses are served from a queue of canned JSON values
/// keyed by `schema_name`; plain completions and streams return canned
/// strings in call order. Every call is recorded for assertions.
pub struct FakeProvider {
    name: String,
    structured_responses: Mutex<HashMap<String, Vec<Value>>>,
    text_responses: Mutex<Vec<String>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeProvider {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            structured_responses: Mutex::new(HashMap::new()),
            text_responses: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a structured response to be returned the next time `complete`
    /// is called with this `schema_name`.
    pub fn push_structured(&self, schema_name: &str, value: Value) {
        self.structured_responses
            .lock()
            .unwrap()
            .entry(schema_name.to_string())
            .or_default()
            .push(value);
    }

    /// Queue plain text to be returned by the next unscoped `complete` or
    /// streamed token-by-token by the next `stream` call.
    pub fn push_text(&self, text: impl Into<String>) {
        self.text_responses.lock().unwrap().push(text.into());
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_model(&self, _model: &str) -> bool {
        true
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _model: &str,
        _temperature: f32,
        _max_tokens: usize,
        schema_name: Option<&str>,
    ) -> Result<Completion> {
        self.calls.lock().unwrap().push(format!(
            "complete(schema={})",
            schema_name.unwrap_or("none")
        ));
        if let Some(schema_name) = schema_name {
            let mut structured = self.structured_responses.lock().unwrap();
            let queue = structured.entry(schema_name.to_string()).or_default();
            if queue.is_empty() {
                return Err(Error::Provider {
                    provider: self.name.clone(),
                    message: format!("no canned structured response for {schema_name}"),
                });
            }
            return Ok(Completion::Structured(queue.remove(0)));
        }
        let mut texts = self.text_responses.lock().unwrap();
        if texts.is_empty() {
            return Err(Error::Provider {
                provider: self.name.clone(),
                message: "no canned text response".to_string(),
            });
        }
        Ok(Completion::Text(texts.remove(0)))
    }

    async fn stream(
        &self,
        _messages: &[Message],
        _model: &str,
        _temperature: f32,
        _max_tokens: usize,
    ) -> Result<TokenStream> {
        self.calls.lock().unwrap().push("stream".to_string());
        let mut texts = self.text_responses.lock().unwrap();
        if texts.is_empty() {
            return Err(Error::Provider {
                provider: self.name.clone(),
                message: "no canned text response to stream".to_string(),
            });
        }
        let text = texts.remove(0);
        let tokens: Vec<Result<String>> = text
            .split_inclusive(' ')
            .map(|s| Ok(s.to_string()))
            .collect();
        Ok(Box::pin(stream::iter(tokens)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_resolves_default() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(FakeProvider::new("fake")));
        registry.set_default("fake");
        let provider = registry.resolve(None).unwrap();
        assert_eq!(provider.name(), "fake");
    }

    #[tokio::test]
    async fn registry_errors_on_unknown_provider() {
        let registry = ProviderRegistry::new();
        assert!(registry.resolve(Some("nope")).is_err());
    }

    #[tokio::test]
    async fn fake_provider_streams_canned_tokens_in_order() {
        let provider = FakeProvider::new("fake");
        provider.push_text("hello world");
        let mut stream = provider
            .stream(&[], "fake-model", 0.7, 100)
            .await
            .unwrap();
        let mut out = String::new();
        while let Some(tok) = stream.next().await {
            out.push_str(&tok.unwrap());
        }
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn fake_provider_serves_structured_responses_by_schema() {
        let provider = FakeProvider::new("fake");
        provider.push_structured("guardrail", serde_json::json!({"score": 90}));
        let resp = provider
            .complete(&[], "fake-model", 0.3, 100, Some("guardrail"))
            .await
            .unwrap();
        match resp {
            Completion::Structured(v) => assert_eq!(v["score"], 90),
            Completion::Text(_) => panic!("expected structured response"),
        }
    }
}
