//! Flows: one named request/response operation per feature, each backed by a model call.
//!
//! Every flow is: validate input → render prompt (pure) → one model call → decode reply.
//! Rendering and decoding are plain functions so they are testable without a model.
//! All model access goes through `llm_client::LanguageModel`.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::{strip_json_fences, LanguageModel, LlmError, ModelRequest};

pub mod free_text;
pub mod grammar;
pub mod handlers;
pub mod pronunciation;
pub mod prompts;
pub mod roleplay;
pub mod vocab_list;
pub mod vocabulary;

/// Input rejected before any model call is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0}")]
    Empty(&'static str),

    #[error("{field} must not be blank when provided")]
    BlankOptional { field: &'static str },

    #[error("{0}")]
    Invalid(String),
}

/// The model replied, but not with something the output schema accepts.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("reply is not valid JSON for the output schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("required field '{0}' is missing or empty")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The model call failed or produced an unusable result.
    #[error("{flow} failed: {cause}")]
    Model {
        flow: &'static str,
        /// Fixed retry message shown to the user.
        user_message: &'static str,
        cause: String,
    },
}

pub trait Flow {
    const NAME: &'static str;
    const FAILURE_MESSAGE: &'static str;

    type Input: Sync;
    type Output;

    fn validate(input: &Self::Input) -> Result<(), ValidationError>;

    fn render(input: &Self::Input) -> ModelRequest;

    fn decode(input: &Self::Input, reply: &str) -> Result<Self::Output, DecodeError>;
}

/// Runs a flow end to end. No retries: a failure is surfaced to the caller as-is.
pub async fn run_flow<F: Flow>(
    model: &dyn LanguageModel,
    input: &F::Input,
) -> Result<F::Output, FlowError> {
    F::validate(input)?;
    let request = F::render(input);

    info!(flow = F::NAME, structured = request.output_schema.is_some(), "Invoking flow");

    let reply = model
        .generate(&request)
        .await
        .map_err(|e| model_failure::<F>(&e))?;

    F::decode(input, &reply).map_err(|e| {
        warn!(flow = F::NAME, "Model reply rejected: {e}");
        FlowError::Model {
            flow: F::NAME,
            user_message: F::FAILURE_MESSAGE,
            cause: e.to_string(),
        }
    })
}

fn model_failure<F: Flow>(error: &LlmError) -> FlowError {
    warn!(flow = F::NAME, "Model call failed: {error}");
    FlowError::Model {
        flow: F::NAME,
        user_message: F::FAILURE_MESSAGE,
        cause: error.to_string(),
    }
}

/// Decodes a schema-constrained reply. A `null` reply fails here.
pub fn decode_json<T: DeserializeOwned>(reply: &str) -> Result<T, DecodeError> {
    Ok(serde_json::from_str(strip_json_fences(reply))?)
}

pub fn require_text(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty(message))
    } else {
        Ok(())
    }
}

pub fn require_optional(value: Option<&str>, field: &'static str) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ValidationError::BlankOptional { field }),
        _ => Ok(()),
    }
}

/// Trims an optional request field, treating blank input as absent.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Output-side check for required strings; the schema says present, this says non-empty.
pub fn check_present(value: &str, field: &'static str) -> Result<(), DecodeError> {
    if value.trim().is_empty() {
        Err(DecodeError::MissingField(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_optional_drops_blank() {
        assert_eq!(normalize_optional(None), None);
        assert_eq!(normalize_optional(Some("   ".into())), None);
        assert_eq!(normalize_optional(Some(" bn ".into())), Some("bn".into()));
    }

    #[test]
    fn test_require_optional_rejects_blank_present_value() {
        assert!(require_optional(None, "languageCode").is_ok());
        assert!(require_optional(Some("hi"), "languageCode").is_ok());
        assert_eq!(
            require_optional(Some(" "), "languageCode"),
            Err(ValidationError::BlankOptional {
                field: "languageCode"
            })
        );
    }

    #[test]
    fn test_decode_json_rejects_null() {
        #[derive(Debug, serde::Deserialize)]
        struct Out {
            #[allow(dead_code)]
            a: String,
        }
        assert!(decode_json::<Out>("null").is_err());
        assert!(decode_json::<Out>("```json\n{\"a\": \"x\"}\n```").is_ok());
    }
}
