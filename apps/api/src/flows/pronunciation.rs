//! Pronunciation feedback on a recorded attempt at a piece of English text.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::flows::prompts::{
    PRONUNCIATION_PROMPT_AFTER_RECORDING, PRONUNCIATION_PROMPT_BEFORE_RECORDING,
};
use crate::flows::{check_present, decode_json, require_text, DecodeError, Flow, ValidationError};
use crate::llm_client::prompts::{render_template, STRUCTURED_SYSTEM};
use crate::llm_client::{ModelRequest, PromptPart};
use crate::models::media::DataUri;

/// Request body as submitted by the client; the recording is still an unchecked string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PronunciationRequest {
    pub text: String,
    pub user_recording: String,
}

impl PronunciationRequest {
    /// Checks the recording before any model call. Only a valid data URI gets through.
    pub fn into_input(self) -> Result<PronunciationInput, ValidationError> {
        if self.text.trim().is_empty() || self.user_recording.trim().is_empty() {
            return Err(ValidationError::Empty(
                "Please enter the text and your recording data URI.",
            ));
        }
        let recording = DataUri::parse(self.user_recording.trim()).map_err(|e| {
            ValidationError::Invalid(format!(
                "The user recording must be a valid data URI (e.g., data:audio/wav;base64,...): {e}"
            ))
        })?;
        Ok(PronunciationInput {
            text: self.text,
            recording,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PronunciationInput {
    pub text: String,
    pub recording: DataUri,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PronunciationResult {
    pub feedback: String,
}

pub struct PronunciationFeedback;

impl Flow for PronunciationFeedback {
    const NAME: &'static str = "pronunciationFeedback";
    const FAILURE_MESSAGE: &'static str =
        "Failed to get pronunciation feedback. Please try again.";

    type Input = PronunciationInput;
    type Output = PronunciationResult;

    fn validate(input: &PronunciationInput) -> Result<(), ValidationError> {
        require_text(&input.text, "Please enter the text to pronounce.")
    }

    fn render(input: &PronunciationInput) -> ModelRequest {
        let before = render_template(
            PRONUNCIATION_PROMPT_BEFORE_RECORDING,
            &[("text", input.text.as_str())],
        );

        ModelRequest::with_parts(
            STRUCTURED_SYSTEM,
            vec![
                PromptPart::Text(before),
                PromptPart::Media {
                    mime_type: input.recording.mime_type().to_string(),
                    data: input.recording.payload().to_string(),
                },
                PromptPart::Text(PRONUNCIATION_PROMPT_AFTER_RECORDING.to_string()),
            ],
        )
        .with_schema(output_schema())
    }

    fn decode(_input: &PronunciationInput, reply: &str) -> Result<PronunciationResult, DecodeError> {
        let result: PronunciationResult = decode_json(reply)?;
        check_present(&result.feedback, "feedback")?;
        Ok(result)
    }
}

fn output_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "feedback": {"type": "STRING", "description": "Specific, actionable feedback on the student's pronunciation."}
        },
        "required": ["feedback"]
    })
}
