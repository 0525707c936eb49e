//! Structured generation client - turns one oracle call into a value that
//! provably conforms to a registered schema, or a typed failure.
//!
//! Oracles are unreliable emitters, so the client is defensive at three
//! independent layers: text extraction (strip decorative code fences),
//! parse (reclassify JSON errors), and validation (reclassify schema
//! mismatches). Raw oracle errors and malformed payloads are logged here in
//! full and never travel further up than a [`GenerationError`], whose public
//! rendering is generic. No retry is attempted; a single failure surfaces
//! immediately and the caller decides whether to retry the whole request.

use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::oracle::Oracle;
use subtext_core::{schema, GenerationError, ImagePayload, SchemaName};

#[derive(Debug, Clone)]
pub struct StructuredClient {
    oracle: Arc<dyn Oracle>,
}

impl StructuredClient {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// One schema-conformant generation.
    ///
    /// `T` must deserialize from exactly the shape `schema` validates;
    /// drift between the two is a contract break, not a runtime condition.
    pub async fn generate<T: DeserializeOwned>(
        &self,
        system_instruction: &str,
        user_payload: &str,
        image: Option<&ImagePayload>,
        schema: SchemaName,
    ) -> Result<T, GenerationError> {
        let raw = self
            .oracle
            .invoke(system_instruction, user_payload, image)
            .await
            .map_err(|err| {
                tracing::error!("oracle invocation failed for `{}`: {:#}", schema, err);
                GenerationError::Oracle(format!("{:#}", err))
            })?;

        if raw.trim().is_empty() {
            tracing::error!("oracle returned empty output for `{}`", schema);
            return Err(GenerationError::EmptyOutput);
        }

        let json_str = extract_json_object(&raw);

        let value: serde_json::Value = serde_json::from_str(&json_str).map_err(|err| {
            tracing::error!(
                "oracle output for `{}` failed to parse as JSON: {}\nraw output:\n{}",
                schema,
                err,
                raw
            );
            GenerationError::Parse {
                detail: err.to_string(),
            }
        })?;

        schema::validate(&value, schema).map_err(|violation| {
            tracing::error!(
                "oracle output for `{}` failed validation:\n{}",
                schema,
                violation.details()
            );
            GenerationError::Schema(violation)
        })?;

        // A value that passed validation deserializes into the stage
        // payload; a mismatch here means the registry and the type drifted.
        serde_json::from_value(value).map_err(|err| {
            tracing::error!("validated `{}` value failed to deserialize: {}", schema, err);
            GenerationError::Parse {
                detail: err.to_string(),
            }
        })
    }
}

/// Extract a JSON object from text that may carry markdown decoration.
///
/// Takes the span from the first `{` to the last `}`; falls back to
/// trimming fence characters when no braces are present.
fn extract_json_object(raw: &str) -> String {
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            return raw[start..=end].to_string();
        }
    }
    raw.trim_matches(|c: char| c == '`' || c.is_whitespace())
        .trim_start_matches("json")
        .trim()
        .to_string()
}
