use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "linguamate-api",
        "authListening": !state.auth.hub().is_loading(),
        "signedInUsers": state.auth.hub().signed_in_count().await,
    }))
}
