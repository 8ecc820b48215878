//! Vocabulary explainer: definition, IPA, example, usage tip, translation, synonyms, antonyms.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::flows::free_text::{ParsedVocabulary, VocabularyFreeText};
use crate::flows::prompts::{VOCABULARY_PROMPT_TEMPLATE, VOCABULARY_TRANSLATION_SECTION};
use crate::flows::{
    check_present, decode_json, normalize_optional, require_optional, require_text, run_flow,
    DecodeError, Flow, FlowError, ValidationError,
};
use crate::llm_client::prompts::{render_template, PERSONA, STRUCTURED_SYSTEM};
use crate::llm_client::{LanguageModel, ModelRequest};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyRequest {
    pub word: String,
    #[serde(default)]
    pub native_language_code: Option<String>,
}

impl VocabularyRequest {
    /// Trims the word and drops a blank language code.
    pub fn normalized(self) -> Self {
        Self {
            word: self.word.trim().to_string(),
            native_language_code: normalize_optional(self.native_language_code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyResult {
    /// The explained word, possibly corrected or in its base form.
    pub word: String,
    pub meaning_english: String,
    #[serde(
        rename = "pronunciationIPA",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pronunciation_ipa: Option<String>,
    pub example_sentence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_tip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_language_translation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub antonyms: Option<Vec<String>>,
}

/// What the vocabulary endpoint hands back: schema-decoded, or the labeled free-text fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum VocabularyLookup {
    Structured(VocabularyResult),
    Parsed(ParsedVocabulary),
}

pub struct ExplainVocabulary;

impl Flow for ExplainVocabulary {
    const NAME: &'static str = "vocabularyExplainer";
    const FAILURE_MESSAGE: &'static str =
        "Failed to get vocabulary information. Please try again.";

    type Input = VocabularyRequest;
    type Output = VocabularyResult;

    fn validate(input: &VocabularyRequest) -> Result<(), ValidationError> {
        require_text(&input.word, "Please enter a word.")?;
        require_optional(input.native_language_code.as_deref(), "nativeLanguageCode")
    }

    fn render(input: &VocabularyRequest) -> ModelRequest {
        let translation_section = match &input.native_language_code {
            Some(code) => render_template(
                VOCABULARY_TRANSLATION_SECTION,
                &[
                    ("word", input.word.as_str()),
                    ("native_language_code", code.as_str()),
                ],
            ),
            None => String::new(),
        };

        let prompt = render_template(
            VOCABULARY_PROMPT_TEMPLATE,
            &[
                ("persona", PERSONA),
                ("word", input.word.as_str()),
                ("translation_section", translation_section.as_str()),
            ],
        );

        ModelRequest::new(STRUCTURED_SYSTEM, prompt).with_schema(output_schema())
    }

    fn decode(_input: &VocabularyRequest, reply: &str) -> Result<VocabularyResult, DecodeError> {
        let mut result: VocabularyResult = decode_json(reply)?;
        check_present(&result.word, "word")?;
        check_present(&result.meaning_english, "meaningEnglish")?;
        check_present(&result.example_sentence, "exampleSentence")?;

        // An empty optional means the model had nothing to say.
        result.pronunciation_ipa = non_blank(result.pronunciation_ipa);
        result.usage_tip = non_blank(result.usage_tip);
        result.native_language_translation = non_blank(result.native_language_translation);
        Ok(result)
    }
}

/// Looks a word up through the schema-constrained explainer, or through the
/// labeled free-text fallback when the backend cannot guarantee structured output.
pub async fn lookup_vocabulary(
    model: &dyn LanguageModel,
    structured_output: bool,
    request: &VocabularyRequest,
) -> Result<VocabularyLookup, FlowError> {
    if structured_output {
        run_flow::<ExplainVocabulary>(model, request)
            .await
            .map(VocabularyLookup::Structured)
    } else {
        run_flow::<VocabularyFreeText>(model, request)
            .await
            .map(VocabularyLookup::Parsed)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn output_schema() -> Value {
    let string_list = json!({"type": "ARRAY", "items": {"type": "STRING"}});
    json!({
        "type": "OBJECT",
        "properties": {
            "word": {"type": "STRING", "description": "The explained word, in its base or most common form."},
            "meaningEnglish": {"type": "STRING", "description": "The definition of the word in English."},
            "pronunciationIPA": {"type": "STRING", "description": "IPA transcription of the word."},
            "exampleSentence": {"type": "STRING", "description": "An example sentence using the word in context."},
            "usageTip": {"type": "STRING", "description": "A tip on usage, collocations or common mistakes."},
            "nativeLanguageTranslation": {"type": "STRING", "description": "The word in the requested native language."},
            "synonyms": string_list.clone(),
            "antonyms": string_list,
        },
        "required": ["word", "meaningEnglish", "exampleSentence"]
    })
}
