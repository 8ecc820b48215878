//! Vocabulary list generation from a free-form request ("10 words for beginners").

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::flows::prompts::VOCAB_LIST_PROMPT_TEMPLATE;
use crate::flows::{check_present, decode_json, require_text, DecodeError, Flow, ValidationError};
use crate::llm_client::prompts::{render_template, PERSONA, STRUCTURED_SYSTEM};
use crate::llm_client::ModelRequest;

#[derive(Debug, Clone, Deserialize)]
pub struct VocabListRequest {
    pub request: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabListItem {
    pub word: String,
    pub meaning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentence: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabListResult {
    pub title: String,
    pub items: Vec<VocabListItem>,
}

pub struct VocabListGenerator;

impl Flow for VocabListGenerator {
    const NAME: &'static str = "vocabListGenerator";
    const FAILURE_MESSAGE: &'static str = "Failed to generate vocabulary list. Please try again.";

    type Input = VocabListRequest;
    type Output = VocabListResult;

    fn validate(input: &VocabListRequest) -> Result<(), ValidationError> {
        require_text(
            &input.request,
            "Please enter a request for a vocabulary list.",
        )
    }

    fn render(input: &VocabListRequest) -> ModelRequest {
        let prompt = render_template(
            VOCAB_LIST_PROMPT_TEMPLATE,
            &[("persona", PERSONA), ("request", input.request.trim())],
        );
        ModelRequest::new(STRUCTURED_SYSTEM, prompt).with_schema(output_schema())
    }

    fn decode(_input: &VocabListRequest, reply: &str) -> Result<VocabListResult, DecodeError> {
        let mut result: VocabListResult = decode_json(reply)?;
        check_present(&result.title, "title")?;

        // Items without a word or meaning are noise; the list itself must survive.
        result
            .items
            .retain(|item| !item.word.trim().is_empty() && !item.meaning.trim().is_empty());
        for item in &mut result.items {
            item.example_sentence = item
                .example_sentence
                .take()
                .filter(|s| !s.trim().is_empty());
        }
        if result.items.is_empty() {
            return Err(DecodeError::MissingField("items"));
        }
        Ok(result)
    }
}

fn output_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {"type": "STRING"},
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "word": {"type": "STRING"},
                        "meaning": {"type": "STRING"},
                        "exampleSentence": {"type": "STRING"}
                    },
                    "required": ["word", "meaning"]
                }
            }
        },
        "required": ["title", "items"]
    })
}
