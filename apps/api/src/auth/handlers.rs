//! Axum route handlers for the Auth API.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;

use crate::auth::{AuthContext, AuthError, AuthSession, IdpCredential, IdpProvider};
use crate::errors::AppError;
use crate::flows::{require_text, ValidationError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl CredentialsRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.email, "Please enter your email.")?;
        require_text(&self.password, "Please enter your password.")
    }
}

#[derive(Debug, Deserialize)]
pub struct IdpSignInRequest {
    pub provider: IdpProvider,
    #[serde(flatten)]
    pub credential: IdpCredential,
}

/// POST /api/v1/auth/sign-up
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<AuthSession>), AppError> {
    request.validate()?;
    let session = state
        .auth
        .sign_up(request.email.trim(), &request.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /api/v1/auth/sign-in
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> Result<Json<AuthSession>, AppError> {
    request.validate()?;
    let session = state
        .auth
        .sign_in(request.email.trim(), &request.password)
        .await?;
    Ok(Json(session))
}

/// POST /api/v1/auth/sign-in/idp
///
/// `{"provider": "google" | "github", "idToken"?, "accessToken"?}` with the credential
/// the client got from the provider.
pub async fn handle_sign_in_with_idp(
    State(state): State<AppState>,
    Json(request): Json<IdpSignInRequest>,
) -> Result<Json<AuthSession>, AppError> {
    let session = state
        .auth
        .sign_in_with_idp(request.provider, &request.credential)
        .await?;
    Ok(Json(session))
}

/// POST /api/v1/auth/sign-out
pub async fn handle_sign_out(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<StatusCode, AppError> {
    let user = auth.require_user()?;
    let id_token = auth.id_token.as_deref().ok_or(AuthError::NotSignedIn)?;
    info!(uid = %user.uid, "User signing out");
    state.auth.sign_out(id_token).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
///
/// `{user, loading}` for the bearer token. Anonymous callers get `user: null`, not a 401.
pub async fn handle_me(auth: AuthContext) -> Json<AuthContext> {
    Json(auth)
}
