// All prompt templates for the flows module.
// Placeholders are `{name}`, filled by llm_client::prompts::render_template.
// Optional sections are separate constants so an absent field drops the whole paragraph.

/// Vocabulary explainer. Replace: {persona}, {word}, {translation_section}
pub const VOCABULARY_PROMPT_TEMPLATE: &str = r#"{persona} You are also an expert English lexicographer.
Explain the English word: {word}

Fill in the following:
- word: the word itself, in its base or most common form (e.g. "run" rather than "running").
- meaningEnglish: a clear and concise definition in English.
- pronunciationIPA: the International Phonetic Alphabet transcription. Leave it out if unsure.
- exampleSentence: one sentence that clearly shows how the word is used.
- usageTip: a practical tip, a common collocation or a frequent mistake. Leave it out if nothing useful applies.
{translation_section}- synonyms: a short list (3-5) of words with a similar meaning.
- antonyms: a short list (3-5) of words with the opposite meaning, if any exist.

Word to explain: {word}"#;

/// Included only when a native language code is supplied. Replace: {word}, {native_language_code}
pub const VOCABULARY_TRANSLATION_SECTION: &str = "- nativeLanguageTranslation: Translate \"{word}\" into the language with code {native_language_code}.\n";

/// Pronunciation feedback, text before the recording. Replace: {text}
pub const PRONUNCIATION_PROMPT_BEFORE_RECORDING: &str = r#"You are an English pronunciation tutor. A student is trying to pronounce the following text:

{text}

This is the audio recording of their attempt:
"#;

/// Pronunciation feedback, text after the recording.
pub const PRONUNCIATION_PROMPT_AFTER_RECORDING: &str = r#"
Give the student specific, actionable feedback on their pronunciation. Point at the exact sounds or words they should work on and how to improve them. Do not be generic.
Put the feedback in the `feedback` field."#;

/// Grammar assistance. Replace: {persona}, {text}, {native_language_section}
pub const GRAMMAR_PROMPT_TEMPLATE: &str = r#"{persona} Analyze the text below for grammar errors and provide a corrected version along with an explanation of the grammar rules applied.
If the text is already correct, return it unchanged and explain why it is correct.

Text: {text}
{native_language_section}
Reply with:
- correctedText: the corrected text.
- explanation: the grammar rules relevant to the corrections."#;

/// Included only when a native language code is supplied. Replace: {language_code}
pub const GRAMMAR_NATIVE_LANGUAGE_SECTION: &str = "\nThe user's native language code is: {language_code}. Provide a brief explanation of the grammar rules in their native language as well.\n";

/// Roleplay turn. Replace: {persona}, {scenario}, {user_utterance}
pub const ROLEPLAY_PROMPT_TEMPLATE: &str = r#"{persona} You are helping the user practice spoken English in a roleplay scenario.

The scenario is: {scenario}

User: {user_utterance}

Respond in character within the scenario. Keep the reply concise and helpful for practicing English conversation, using natural, idiomatic language.
Put your reply in the `botResponse` field."#;

/// Vocabulary list generation. Replace: {persona}, {request}
pub const VOCAB_LIST_PROMPT_TEMPLATE: &str = r#"{persona} Generate an English vocabulary list for the following request: "{request}"

Reply with:
- title: a short title for the list.
- items: the words in the list. For each item give `word`, a short English `meaning`, and an `exampleSentence` where possible.

Respect any size or level the request asks for. If it names neither, give 10 words."#;

/// Free-text vocabulary lookup, read back by flows::free_text. Replace: {persona}, {word}, {native_meaning_line}
pub const VOCABULARY_FREE_TEXT_TEMPLATE: &str = r#"{persona} Explain the English word: {word}

Answer with exactly these labeled lines, one label per line, and nothing else:
Meaning (English): <a clear and concise definition>
{native_meaning_line}Pronunciation: <the IPA transcription>
Example: <one example sentence>
Usage Tip: <a practical tip or common mistake>"#;

/// Included only when a native language code is supplied. Replace: {native_language_code}
pub const VOCABULARY_FREE_TEXT_NATIVE_LINE: &str =
    "Meaning ({native_language_code}): <the word translated into the language with code {native_language_code}>\n";
