//! Interactive roleplay: one bot reply to one user utterance within a scenario.
//! Transcript handling lives in crate::roleplay; this flow is stateless.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::flows::prompts::ROLEPLAY_PROMPT_TEMPLATE;
use crate::flows::{check_present, decode_json, require_text, DecodeError, Flow, ValidationError};
use crate::llm_client::prompts::{render_template, PERSONA, STRUCTURED_SYSTEM};
use crate::llm_client::ModelRequest;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleplayTurnRequest {
    pub scenario: String,
    pub user_utterance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleplayTurnResult {
    pub bot_response: String,
}

pub struct InteractiveRoleplay;

impl Flow for InteractiveRoleplay {
    const NAME: &'static str = "interactiveRoleplay";
    const FAILURE_MESSAGE: &'static str = "Failed to get bot response. Please try again.";

    type Input = RoleplayTurnRequest;
    type Output = RoleplayTurnResult;

    fn validate(input: &RoleplayTurnRequest) -> Result<(), ValidationError> {
        require_text(&input.scenario, "Please enter or select a scenario.")?;
        require_text(&input.user_utterance, "Please enter something to say.")
    }

    fn render(input: &RoleplayTurnRequest) -> ModelRequest {
        let prompt = render_template(
            ROLEPLAY_PROMPT_TEMPLATE,
            &[
                ("persona", PERSONA),
                ("scenario", input.scenario.as_str()),
                ("user_utterance", input.user_utterance.as_str()),
            ],
        );
        ModelRequest::new(STRUCTURED_SYSTEM, prompt).with_schema(output_schema())
    }

    fn decode(_input: &RoleplayTurnRequest, reply: &str) -> Result<RoleplayTurnResult, DecodeError> {
        let result: RoleplayTurnResult = decode_json(reply)?;
        check_present(&result.bot_response, "botResponse")?;
        Ok(result)
    }
}

fn output_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "botResponse": {"type": "STRING", "description": "The bot's reply within the roleplay scenario."}
        },
        "required": ["botResponse"]
    })
}
