//! Roleplay sessions: a scenario plus an append-only transcript.
//!
//! State machine:
//!   ScenarioUnset --start_scenario--> ScenarioActive
//!   ScenarioActive --begin_turn/complete_turn--> ScenarioActive
//!   ScenarioActive --change_scenario--> ScenarioUnset
//!
//! At most one model call is outstanding per session (`pending`). The user turn is
//! appended before the model answers and is never rolled back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::flows::roleplay::{InteractiveRoleplay, RoleplayTurnRequest};
use crate::flows::{require_text, run_flow, Flow, FlowError, ValidationError};
use crate::llm_client::LanguageModel;
use crate::models::conversation::ConversationTurn;

pub mod handlers;
pub mod store;

pub use store::SessionStore;

/// Bot turn appended when the model call fails, so the transcript stays coherent.
pub const APOLOGY_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// Suggested scenarios offered before a session starts.
pub const COMMON_SCENARIOS: &[&str] = &[
    "Ordering food at a restaurant",
    "Checking in at an airport",
    "Asking for directions",
    "Shopping for clothes",
    "A job interview",
];

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("roleplay session {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a scenario is already active; change the scenario first")]
    ScenarioActive,

    #[error("no scenario is set; start a scenario first")]
    ScenarioUnset,

    #[error("still waiting for the previous reply")]
    TurnPending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum RoleplayState {
    ScenarioUnset,
    #[serde(rename_all = "camelCase")]
    ScenarioActive {
        scenario: String,
        turns: Vec<ConversationTurn>,
        pending: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleplaySession {
    pub id: Uuid,
    #[serde(flatten)]
    state: RoleplayState,
    pub created_at: DateTime<Utc>,
    /// Last scenario change or turn; idle sessions are evicted by the store.
    pub last_active_at: DateTime<Utc>,
    /// Bumped on every scenario change; stale model replies are dropped.
    #[serde(skip)]
    epoch: u64,
}

/// Handed out by `begin_turn`; redeemed by `complete_turn`.
#[derive(Debug, Clone)]
pub struct TurnTicket {
    epoch: u64,
    pub request: RoleplayTurnRequest,
}

impl Default for RoleplaySession {
    fn default() -> Self {
        Self::new()
    }
}

impl RoleplaySession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            state: RoleplayState::ScenarioUnset,
            created_at: now,
            last_active_at: now,
            epoch: 0,
        }
    }

    pub fn scenario(&self) -> Option<&str> {
        match &self.state {
            RoleplayState::ScenarioActive { scenario, .. } => Some(scenario.as_str()),
            RoleplayState::ScenarioUnset => None,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        match &self.state {
            RoleplayState::ScenarioActive { turns, .. } => turns.as_slice(),
            RoleplayState::ScenarioUnset => &[],
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, RoleplayState::ScenarioActive { pending: true, .. })
    }

    /// Sets the scenario and replaces the transcript with a single opening bot turn.
    pub fn start_scenario(&mut self, scenario: &str) -> Result<(), SessionError> {
        require_text(scenario, "Please enter or select a scenario.")?;
        if matches!(self.state, RoleplayState::ScenarioActive { .. }) {
            return Err(SessionError::ScenarioActive);
        }

        let scenario = scenario.trim().to_string();
        let opening = opening_message(&scenario);
        self.epoch += 1;
        self.last_active_at = Utc::now();
        self.state = RoleplayState::ScenarioActive {
            scenario,
            turns: vec![ConversationTurn::bot(opening)],
            pending: false,
        };
        Ok(())
    }

    /// Clears scenario and transcript. Any reply still in flight is discarded on arrival.
    pub fn change_scenario(&mut self) {
        self.epoch += 1;
        self.last_active_at = Utc::now();
        self.state = RoleplayState::ScenarioUnset;
    }

    /// Appends the user turn right away and marks the session pending.
    pub fn begin_turn(&mut self, utterance: &str) -> Result<TurnTicket, SessionError> {
        require_text(utterance, "Please enter something to say.")?;
        let epoch = self.epoch;

        match &mut self.state {
            RoleplayState::ScenarioUnset => Err(SessionError::ScenarioUnset),
            RoleplayState::ScenarioActive { pending: true, .. } => Err(SessionError::TurnPending),
            RoleplayState::ScenarioActive {
                scenario,
                turns,
                pending,
            } => {
                let utterance = utterance.trim().to_string();
                turns.push(ConversationTurn::user(utterance.clone()));
                *pending = true;
                self.last_active_at = Utc::now();
                Ok(TurnTicket {
                    epoch,
                    request: RoleplayTurnRequest {
                        scenario: scenario.clone(),
                        user_utterance: utterance,
                    },
                })
            }
        }
    }

    /// Appends exactly one bot turn: the reply, or the apology when `reply` is `None`.
    /// Returns `false` if the scenario changed since the ticket was issued.
    pub fn complete_turn(&mut self, ticket: &TurnTicket, reply: Option<String>) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        match &mut self.state {
            RoleplayState::ScenarioActive { turns, pending, .. } if *pending => {
                let text = reply.unwrap_or_else(|| APOLOGY_MESSAGE.to_string());
                turns.push(ConversationTurn::bot(text));
                *pending = false;
                self.last_active_at = Utc::now();
                true
            }
            _ => false,
        }
    }
}

pub fn opening_message(scenario: &str) -> String {
    format!("Okay, let's practice the scenario: \"{scenario}\". What would you like to say first?")
}

/// Result of one user utterance: the transcript after the bot answered (or apologized).
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub session: RoleplaySession,
    /// Set when the model call failed and the apology turn was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

/// Runs one roleplay turn against the store. The store lock is not held during the model call.
///
/// The model call and the bot turn run on their own task: if the caller goes away
/// mid-turn, the turn still completes and the session does not stay pending.
pub async fn take_turn(
    store: &SessionStore,
    model: Arc<dyn LanguageModel>,
    session_id: Uuid,
    utterance: &str,
) -> Result<TurnReport, SessionError> {
    let ticket = store.begin_turn(session_id, utterance).await?;

    let task = tokio::spawn(finish_turn(
        store.clone(),
        model,
        session_id,
        ticket.clone(),
    ));
    match task.await {
        Ok(report) => report,
        Err(e) => {
            warn!(%session_id, "Roleplay turn task failed: {e}");
            let session = store.complete_turn(session_id, &ticket, None).await?;
            Ok(TurnReport {
                session,
                error: Some(InteractiveRoleplay::FAILURE_MESSAGE),
            })
        }
    }
}

async fn finish_turn(
    store: SessionStore,
    model: Arc<dyn LanguageModel>,
    session_id: Uuid,
    ticket: TurnTicket,
) -> Result<TurnReport, SessionError> {
    let outcome = run_flow::<InteractiveRoleplay>(model.as_ref(), &ticket.request).await;
    let (reply, error) = match outcome {
        Ok(result) => (Some(result.bot_response), None),
        Err(FlowError::Model {
            user_message,
            cause,
            ..
        }) => {
            warn!(%session_id, "Roleplay turn failed: {cause}");
            (None, Some(user_message))
        }
        Err(FlowError::Validation(e)) => {
            // begin_turn already validated; keep the transcript consistent regardless.
            warn!(%session_id, "Roleplay turn rejected: {e}");
            (None, Some(InteractiveRoleplay::FAILURE_MESSAGE))
        }
    };

    let session = store.complete_turn(session_id, &ticket, reply).await?;
    info!(
        %session_id,
        scenario = session.scenario().unwrap_or_default(),
        turns = session.turns().len(),
        "Roleplay turn completed"
    );

    Ok(TurnReport { session, error })
}
