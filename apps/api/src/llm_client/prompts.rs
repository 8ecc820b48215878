// Shared prompt constants and prompt-building utilities.
// Each flow defines its own templates in flows/prompts.rs.
// This file contains cross-cutting prompt fragments.

/// Persona every flow speaks as.
pub const PERSONA: &str = "You are LinguaMate, an English learning assistant.";

/// System instruction for schema-constrained flows.
pub const STRUCTURED_SYSTEM: &str = "You are LinguaMate, a precise English learning assistant. \
    You MUST respond with a single JSON object that matches the requested schema. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// System instruction for flows whose reply is read as plain text.
pub const PLAIN_TEXT_SYSTEM: &str = "You are LinguaMate, a friendly English learning assistant. \
    Answer in plain text. Do NOT use markdown formatting.";

/// Renders `{name}` placeholders in a single pass.
///
/// Values are inserted verbatim and never re-scanned, so user text containing
/// `{something}` cannot trigger a second substitution. Braces that do not enclose
/// a known identifier (JSON examples, unknown names) are emitted unchanged.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..name_len];
        let closes = after[name_len..].starts_with('}');

        match vars.iter().find(|(key, _)| *key == name) {
            Some((_, value)) if closes && !name.is_empty() => {
                out.push_str(value);
                rest = &after[name_len + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
