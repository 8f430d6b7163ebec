//! Structured-output parsing shared by every LLM-backed graph node.
//!
//! §9 Design Notes: "where the engine depends on a schema ... the adapter
//! must either natively support constrained decoding or the engine must
//! parse and validate the text response". This module implements the
//! parse-and-validate half; the retry-once-then-fallback half lives in
//! each node, since the fallback differs per node (§4.F).

use jsonschema::JSONSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// A compiled JSON-schema used to validate a structured LLM response
/// before deserializing it into `T`.
pub struct SchemaSpec {
    pub name: &'static str,
    schema: Value,
}

impl SchemaSpec {
    #[must_use]
    pub fn new(name: &'static str, schema: Value) -> Self {
        Self { name, schema }
    }

    fn compiled(&self) -> Result<JSONSchema> {
        JSONSchema::compile(&self.schema)
            .map_err(|e| Error::SchemaParse(format!("{}: invalid schema: {e}", self.name)))
    }
}

/// Validate `value` against `spec`, then deserialize into `T`.
///
/// Returns `Err(Error::SchemaParse)` on either a schema violation or a
/// deserialization mismatch; callers retry once then invoke the per-node
/// fallback (§4.F failure semantics).
pub fn parse_and_validate<T: DeserializeOwned>(spec: &SchemaSpec, value: &Value) -> Result<T> {
    let compiled = spec.compiled()?;
    if let Err(errors) = compiled.validate(value) {
        let detail = errors
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::SchemaParse(format!(
            "{}: schema violation: {detail}",
            spec.name
        )));
    }
    serde_json::from_value(value.clone())
        .map_err(|e| Error::SchemaParse(format!("{}: deserialize failed: {e}", spec.name)))
}
