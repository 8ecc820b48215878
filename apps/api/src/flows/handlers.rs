//! Axum route handlers for the learning features.

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::flows::grammar::{GrammarAssistance, GrammarRequest, GrammarResult};
use crate::flows::pronunciation::{PronunciationFeedback, PronunciationRequest, PronunciationResult};
use crate::flows::roleplay::{InteractiveRoleplay, RoleplayTurnRequest, RoleplayTurnResult};
use crate::flows::vocab_list::{VocabListGenerator, VocabListRequest, VocabListResult};
use crate::flows::vocabulary::{lookup_vocabulary, VocabularyLookup, VocabularyRequest};
use crate::flows::run_flow;
use crate::state::AppState;

/// POST /api/v1/vocabulary/explain
///
/// Structured explanation by default; labeled free-text parsing when the backend
/// is configured without schema-constrained output.
pub async fn handle_explain_vocabulary(
    State(state): State<AppState>,
    Json(request): Json<VocabularyRequest>,
) -> Result<Json<VocabularyLookup>, AppError> {
    let request = request.normalized();
    let lookup = lookup_vocabulary(
        state.model.as_ref(),
        state.config.structured_output,
        &request,
    )
    .await?;
    Ok(Json(lookup))
}

/// POST /api/v1/pronunciation/feedback
///
/// The recording must be a `data:<mime>;base64,<payload>` URI. Anything else is a 400
/// and the model is never called.
pub async fn handle_pronunciation_feedback(
    State(state): State<AppState>,
    Json(request): Json<PronunciationRequest>,
) -> Result<Json<PronunciationResult>, AppError> {
    let input = request.into_input()?;
    let result = run_flow::<PronunciationFeedback>(state.model.as_ref(), &input).await?;
    Ok(Json(result))
}

/// POST /api/v1/grammar/check
pub async fn handle_grammar_check(
    State(state): State<AppState>,
    Json(request): Json<GrammarRequest>,
) -> Result<Json<GrammarResult>, AppError> {
    let request = request.normalized();
    let result = run_flow::<GrammarAssistance>(state.model.as_ref(), &request).await?;
    Ok(Json(result))
}

/// POST /api/v1/vocab-lists
pub async fn handle_generate_vocab_list(
    State(state): State<AppState>,
    Json(request): Json<VocabListRequest>,
) -> Result<Json<VocabListResult>, AppError> {
    let result = run_flow::<VocabListGenerator>(state.model.as_ref(), &request).await?;
    Ok(Json(result))
}

/// POST /api/v1/roleplay/turn
///
/// Stateless single turn: the caller keeps its own transcript.
pub async fn handle_roleplay_turn(
    State(state): State<AppState>,
    Json(request): Json<RoleplayTurnRequest>,
) -> Result<Json<RoleplayTurnResult>, AppError> {
    let result = run_flow::<InteractiveRoleplay>(state.model.as_ref(), &request).await?;
    Ok(Json(result))
}
