use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use serde::Serialize;

use crate::auth::Identity;
use crate::errors::AppError;
use crate::state::AppState;

/// `{user, loading}` for the current request, resolved from `Authorization: Bearer <idToken>`.
/// Handlers that care about identity take this explicitly; nothing reads a global.
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    pub user: Option<Identity>,
    pub loading: bool,
    #[serde(skip)]
    pub id_token: Option<String>,
}

impl AuthContext {
    pub fn anonymous(loading: bool) -> Self {
        Self {
            user: None,
            loading,
            id_token: None,
        }
    }

    pub fn signed_in(user: Identity, id_token: &str, loading: bool) -> Self {
        Self {
            user: Some(user),
            loading,
            id_token: Some(id_token.to_string()),
        }
    }

    pub fn require_user(&self) -> Result<&Identity, AppError> {
        self.user.as_ref().ok_or(AppError::Unauthorized)
    }

    /// A protected view should send the visitor to the login page.
    pub fn should_redirect_to_login(&self) -> bool {
        self.user.is_none() && !self.loading
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(state.auth.resolve(bearer_token(&parts.headers)).await)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(&headers("bearer  xyz ")), Some("xyz"));
        assert_eq!(bearer_token(&headers("Basic dXNlcg==")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_redirect_only_when_settled_and_anonymous() {
        assert!(AuthContext::anonymous(false).should_redirect_to_login());
        assert!(!AuthContext::anonymous(true).should_redirect_to_login());
        assert!(matches!(
            AuthContext::anonymous(false).require_user(),
            Err(AppError::Unauthorized)
        ));
    }
}
