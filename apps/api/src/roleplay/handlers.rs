//! Axum route handlers for stateful roleplay sessions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::flows::normalize_optional;
use crate::roleplay::{take_turn, RoleplaySession, TurnReport, COMMON_SCENARIOS};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub scenario: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartScenarioRequest {
    pub scenario: String,
}

#[derive(Debug, Deserialize)]
pub struct TurnRequest {
    pub utterance: String,
}

#[derive(Debug, Serialize)]
pub struct ScenariosResponse {
    pub scenarios: &'static [&'static str],
}

/// GET /api/v1/roleplay/scenarios
pub async fn handle_list_scenarios() -> Json<ScenariosResponse> {
    Json(ScenariosResponse {
        scenarios: COMMON_SCENARIOS,
    })
}

/// POST /api/v1/roleplay/sessions
///
/// Body is optional; `{"scenario": "..."}` starts the scenario immediately.
pub async fn handle_create_session(
    State(state): State<AppState>,
    request: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<RoleplaySession>), AppError> {
    let scenario = request.and_then(|Json(r)| normalize_optional(r.scenario));
    let session = state.sessions.create(scenario.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/v1/roleplay/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleplaySession>, AppError> {
    Ok(Json(state.sessions.get(id).await?))
}

/// DELETE /api/v1/roleplay/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/roleplay/sessions/:id/scenario
///
/// 409 while a scenario is already active: change it (DELETE) first.
pub async fn handle_start_scenario(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StartScenarioRequest>,
) -> Result<Json<RoleplaySession>, AppError> {
    Ok(Json(
        state.sessions.start_scenario(id, &request.scenario).await?,
    ))
}

/// DELETE /api/v1/roleplay/sessions/:id/scenario
pub async fn handle_change_scenario(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoleplaySession>, AppError> {
    Ok(Json(state.sessions.change_scenario(id).await?))
}

/// POST /api/v1/roleplay/sessions/:id/turns
///
/// A failed model call is still a 200: the transcript gained the apology turn and
/// `error` carries the retry message.
pub async fn handle_take_turn(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TurnRequest>,
) -> Result<Json<TurnReport>, AppError> {
    let report = take_turn(&state.sessions, state.model.clone(), id, &request.utterance).await?;
    Ok(Json(report))
}
