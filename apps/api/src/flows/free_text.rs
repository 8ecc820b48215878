//! Free-text vocabulary fallback.
//!
//! Best effort only: used when the model backend cannot guarantee schema-constrained
//! output. Scans the reply line by line for known labels and keeps the full reply in
//! `raw_explanation`, so nothing is lost when the model ignores the format.

use serde::Serialize;

use crate::flows::prompts::{VOCABULARY_FREE_TEXT_NATIVE_LINE, VOCABULARY_FREE_TEXT_TEMPLATE};
use crate::flows::vocabulary::{ExplainVocabulary, VocabularyRequest};
use crate::flows::{DecodeError, Flow, ValidationError};
use crate::llm_client::prompts::{render_template, PERSONA, PLAIN_TEXT_SYSTEM};
use crate::llm_client::ModelRequest;

/// Partial vocabulary result recovered from prose. Only labels that were found are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedVocabulary {
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning_english: Option<String>,
    /// Language named in a `Meaning (<lang>):` label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meaning_native: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_tip: Option<String>,
    /// Always the complete original text.
    pub raw_explanation: String,
}

#[derive(Debug, PartialEq)]
enum Label<'a> {
    MeaningEnglish,
    MeaningNative(&'a str),
    Pronunciation,
    Example,
    UsageTip,
}

/// Extracts labeled fields from `raw`. Never fails; a later line with the same label wins.
pub fn parse_vocabulary_text(raw: &str, word: &str) -> ParsedVocabulary {
    let mut parsed = ParsedVocabulary {
        word: word.to_string(),
        raw_explanation: raw.to_string(),
        ..Default::default()
    };

    for line in raw.lines() {
        let Some((label, value)) = match_label(line.trim_start()) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        let value = Some(value.to_string());

        match label {
            Label::MeaningEnglish => parsed.meaning_english = value,
            Label::MeaningNative(lang) => {
                parsed.native_language = Some(lang.to_string());
                parsed.meaning_native = value;
            }
            Label::Pronunciation => parsed.pronunciation = value,
            Label::Example => parsed.example = value,
            Label::UsageTip => parsed.usage_tip = value,
        }
    }

    parsed
}

/// Tries the labels in fixed order; the first match claims the line.
fn match_label(line: &str) -> Option<(Label<'_>, &str)> {
    if let Some(rest) = strip_label(line, "Meaning (English):") {
        return Some((Label::MeaningEnglish, rest));
    }
    if let Some((lang, rest)) = strip_native_meaning(line) {
        return Some((Label::MeaningNative(lang), rest));
    }
    if let Some(rest) = strip_label(line, "Pronunciation:") {
        return Some((Label::Pronunciation, rest));
    }
    if let Some(rest) = strip_label(line, "Example:") {
        return Some((Label::Example, rest));
    }
    strip_label(line, "Usage Tip:").map(|rest| (Label::UsageTip, rest))
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if head.eq_ignore_ascii_case(label) {
        Some(line[label.len()..].trim())
    } else {
        None
    }
}

/// `Meaning (<lang>): value` for any language other than English.
fn strip_native_meaning(line: &str) -> Option<(&str, &str)> {
    let inner = strip_label(line, "Meaning (")?;
    let (lang, rest) = inner.split_once(')')?;
    let rest = rest.strip_prefix(':')?;
    let lang = lang.trim();
    if lang.is_empty() || lang.eq_ignore_ascii_case("english") {
        return None;
    }
    Some((lang, rest.trim()))
}

/// Vocabulary lookup that asks for labeled plain text and reads it back with the parser.
pub struct VocabularyFreeText;

impl Flow for VocabularyFreeText {
    const NAME: &'static str = "vocabularyFreeText";
    const FAILURE_MESSAGE: &'static str = ExplainVocabulary::FAILURE_MESSAGE;

    type Input = VocabularyRequest;
    type Output = ParsedVocabulary;

    fn validate(input: &VocabularyRequest) -> Result<(), ValidationError> {
        ExplainVocabulary::validate(input)
    }

    fn render(input: &VocabularyRequest) -> ModelRequest {
        let native_meaning_line = match &input.native_language_code {
            Some(code) => render_template(
                VOCABULARY_FREE_TEXT_NATIVE_LINE,
                &[("native_language_code", code.as_str())],
            ),
            None => String::new(),
        };

        let prompt = render_template(
            VOCABULARY_FREE_TEXT_TEMPLATE,
            &[
                ("persona", PERSONA),
                ("word", input.word.as_str()),
                ("native_meaning_line", native_meaning_line.as_str()),
            ],
        );

        ModelRequest::new(PLAIN_TEXT_SYSTEM, prompt)
    }

    fn decode(input: &VocabularyRequest, reply: &str) -> Result<ParsedVocabulary, DecodeError> {
        Ok(parse_vocabulary_text(reply, &input.word))
    }
}
