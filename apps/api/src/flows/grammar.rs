//! Grammar assistance: corrected text plus an explanation of the rules applied.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::flows::prompts::{GRAMMAR_NATIVE_LANGUAGE_SECTION, GRAMMAR_PROMPT_TEMPLATE};
use crate::flows::{
    check_present, decode_json, normalize_optional, require_optional, require_text, DecodeError,
    Flow, ValidationError,
};
use crate::llm_client::prompts::{render_template, PERSONA, STRUCTURED_SYSTEM};
use crate::llm_client::ModelRequest;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarRequest {
    pub text: String,
    #[serde(default)]
    pub language_code: Option<String>,
}

impl GrammarRequest {
    /// Drops a blank language code. The text itself is analyzed verbatim.
    pub fn normalized(self) -> Self {
        Self {
            text: self.text,
            language_code: normalize_optional(self.language_code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarResult {
    pub corrected_text: String,
    pub explanation: String,
}

pub struct GrammarAssistance;

impl Flow for GrammarAssistance {
    const NAME: &'static str = "grammarAssistance";
    const FAILURE_MESSAGE: &'static str = "Failed to get grammar assistance. Please try again.";

    type Input = GrammarRequest;
    type Output = GrammarResult;

    fn validate(input: &GrammarRequest) -> Result<(), ValidationError> {
        require_text(&input.text, "Please enter some text to analyze.")?;
        require_optional(input.language_code.as_deref(), "languageCode")
    }

    fn render(input: &GrammarRequest) -> ModelRequest {
        let native_language_section = match &input.language_code {
            Some(code) => render_template(
                GRAMMAR_NATIVE_LANGUAGE_SECTION,
                &[("language_code", code.as_str())],
            ),
            None => String::new(),
        };

        let prompt = render_template(
            GRAMMAR_PROMPT_TEMPLATE,
            &[
                ("persona", PERSONA),
                ("text", input.text.as_str()),
                ("native_language_section", native_language_section.as_str()),
            ],
        );

        ModelRequest::new(STRUCTURED_SYSTEM, prompt).with_schema(output_schema())
    }

    fn decode(_input: &GrammarRequest, reply: &str) -> Result<GrammarResult, DecodeError> {
        let result: GrammarResult = decode_json(reply)?;
        check_present(&result.corrected_text, "correctedText")?;
        check_present(&result.explanation, "explanation")?;
        Ok(result)
    }
}

fn output_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "correctedText": {"type": "STRING", "description": "The corrected text, or the original if it was already correct."},
            "explanation": {"type": "STRING", "description": "The grammar rules relevant to the corrections."}
        },
        "required": ["correctedText", "explanation"]
    })
}
