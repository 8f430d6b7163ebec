//! Shared helpers for calling an `LlmProvider` with a structured-output
//! contract, including the retry-once-then-fallback pattern every
//! LLM-backed node needs (§4.F failure semantics, §9 "Structured LLM
//! outputs").

use scholarly_core::error::Result;
use scholarly_core::schema::{parse_and_validate, SchemaSpec};
use scholarly_core::types::Message;
use scholarly_providers::{Completion, LlmProvider};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Structured-output calls use a small, fixed token budget; they return a
/// short JSON object, never prose.
pub const STRUCTURED_MAX_TOKENS: usize = 512;

/// Generation and out-of-scope replies get a larger budget.
pub const GENERATION_MAX_TOKENS: usize = 1024;

/// Flattens a composed `(system, user)` pair into the single-role message
/// list every `LlmProvider` call takes. `Message` models only
/// conversational turns (§3 Message), so the system template is prepended
/// as a preamble to the final (current) user turn rather than sent as a
/// distinct role. Prior turns come first, in chronological order, so the
/// list reads as an ordinary transcript ending in the current query.
#[must_use]
pub fn compose_messages(system: &str, conversation: &[Message], user: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(conversation.len() + 1);
    messages.extend(conversation.iter().cloned());
    messages.push(Message::user(format!("{system}\n\n{user}")));
    messages
}

/// Calls `provider.complete` with `schema_name = Some(spec.name)`,
/// validates and deserializes the response, retrying the whole
/// call-parse-validate cycle once on any failure. The second failure is
/// returned to the caller, which applies its own per-node fallback
/// (§4.F: "engine records the failure ... and transitions to a safe
/// fallback").
pub async fn structured_call<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    messages: &[Message],
    model: &str,
    temperature: f32,
    spec: &SchemaSpec,
) -> Result<T> {
    let mut last_err = None;
    for _attempt in 0..2 {
        match try_once::<T>(provider, messages, model, temperature, spec).await {
            Ok(value) => return Ok(value),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

async fn try_once<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    messages: &[Message],
    model: &str,
    temperature: f32,
    spec: &SchemaSpec,
) -> Result<T> {
    let completion = provider
        .complete(
            messages,
            model,
            temperature,
            STRUCTURED_MAX_TOKENS,
            Some(spec.name),
        )
        .await?;
    let value: Value = match completion {
        Completion::Structured(v) => v,
        Completion::Text(text) => serde_json::from_str(&text).map_err(|e| {
            scholarly_core::error::Error::SchemaParse(format!(
                "{}: response was not valid JSON: {e}",
                spec.name
            ))
        })?,
    };
    parse_and_validate(spec, &value)
}
