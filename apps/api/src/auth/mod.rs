//! Authentication, delegated entirely to an external identity provider.
//!
//! `IdentityProvider` is the consumed capability (sign up, sign in, federated sign in,
//! token lookup). `AuthHub` is the single process-wide feed of sign-in/sign-out events;
//! one listener task turns it into the shared signed-in user map. Handlers see the
//! result only through the explicit `AuthContext { user, loading }` extractor.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod extract;
pub mod firebase;
pub mod handlers;
pub mod hub;

pub use extract::AuthContext;
pub use hub::{AuthEvent, AuthHub};

/// Firebase ID tokens live for an hour; used when a token carries no readable `exp`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;
const MAX_TOKEN_LIFETIME_SECS: u64 = 24 * 3600;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider refused the request. Carries its message verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("not signed in")]
    NotSignedIn,

    #[error("identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected identity provider response: {0}")]
    Protocol(String),
}

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// Tokens handed back after a successful sign-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user: Identity,
    pub id_token: String,
    pub refresh_token: String,
    /// Seconds until `id_token` expires.
    pub expires_in: u64,
}

/// Federated providers accepted by `sign_in_with_idp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdpProvider {
    Google,
    Github,
}

impl IdpProvider {
    pub fn provider_id(self) -> &'static str {
        match self {
            IdpProvider::Google => "google.com",
            IdpProvider::Github => "github.com",
        }
    }
}

/// OAuth credential obtained by the client from the federated provider's popup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpCredential {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// The identity provider boundary. Carried in `AppState` as `Arc<dyn IdentityProvider>`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_in_with_idp(
        &self,
        provider: IdpProvider,
        credential: &IdpCredential,
    ) -> Result<AuthSession, AuthError>;

    /// Resolves an id token to its user. Rejected when the token is invalid or expired.
    async fn lookup(&self, id_token: &str) -> Result<Identity, AuthError>;
}

/// Sign-in operations plus the event hub they report to.
#[derive(Clone)]
pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    hub: AuthHub,
}

impl AuthService {
    pub fn new(provider: Arc<dyn IdentityProvider>, hub: AuthHub) -> Self {
        Self { provider, hub }
    }

    pub fn hub(&self) -> &AuthHub {
        &self.hub
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let session = self.provider.sign_up(email, password).await?;
        info!(uid = %session.user.uid, "User signed up");
        self.announce(&session).await;
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let session = self.provider.sign_in(email, password).await?;
        info!(uid = %session.user.uid, "User signed in");
        self.announce(&session).await;
        Ok(session)
    }

    pub async fn sign_in_with_idp(
        &self,
        provider: IdpProvider,
        credential: &IdpCredential,
    ) -> Result<AuthSession, AuthError> {
        let session = self.provider.sign_in_with_idp(provider, credential).await?;
        info!(uid = %session.user.uid, provider = provider.provider_id(), "User signed in");
        self.announce(&session).await;
        Ok(session)
    }

    /// Forgets the token and refuses it until it expires, even if the provider
    /// would still accept it.
    pub async fn sign_out(&self, id_token: &str) {
        self.hub.revoke(id_token, token_expiry(id_token)).await;
        self.hub.publish(AuthEvent::SignedOut {
            id_token: id_token.to_string(),
        });
    }

    /// `{user, loading}` for a bearer token. Tokens not seen yet are checked with the provider.
    pub async fn resolve(&self, id_token: Option<&str>) -> AuthContext {
        let loading = self.hub.is_loading();
        let Some(id_token) = id_token else {
            return AuthContext::anonymous(loading);
        };

        if self.hub.is_revoked(id_token).await {
            debug!("Bearer token was signed out");
            return AuthContext::anonymous(loading);
        }

        if let Some(user) = self.hub.user(id_token).await {
            return AuthContext::signed_in(user, id_token, loading);
        }

        let expires_at = token_expiry(id_token);
        if expires_at <= Utc::now() {
            debug!("Bearer token has expired");
            return AuthContext::anonymous(loading);
        }

        match self.provider.lookup(id_token).await {
            Ok(user) => {
                self.hub.publish(AuthEvent::SignedIn {
                    id_token: id_token.to_string(),
                    user: user.clone(),
                    expires_at,
                });
                AuthContext::signed_in(user, id_token, loading)
            }
            Err(AuthError::Rejected(reason)) => {
                info!("Bearer token rejected by identity provider: {reason}");
                AuthContext::anonymous(loading)
            }
            Err(e) => {
                warn!("Could not verify bearer token: {e}");
                AuthContext::anonymous(loading)
            }
        }
    }

    async fn announce(&self, session: &AuthSession) {
        self.hub.reinstate(&session.id_token).await;
        self.hub.publish(AuthEvent::SignedIn {
            id_token: session.id_token.clone(),
            user: session.user.clone(),
            expires_at: expiry_after(session.expires_in),
        });
    }
}

/// When an ID token stops being valid: its JWT `exp` claim, or an hour from now when
/// the token is not a readable JWT.
pub fn token_expiry(id_token: &str) -> DateTime<Utc> {
    jwt_expiry(id_token).unwrap_or_else(|| expiry_after(DEFAULT_TOKEN_LIFETIME_SECS))
}

fn jwt_expiry(id_token: &str) -> Option<DateTime<Utc>> {
    #[derive(Deserialize)]
    struct Claims {
        exp: i64,
    }

    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.exp, 0)
}

fn expiry_after(seconds: u64) -> DateTime<Utc> {
    let seconds = seconds.min(MAX_TOKEN_LIFETIME_SECS) as i64;
    Utc::now() + Duration::seconds(seconds)
}


#[cfg(test)]
mod tests {
    use super::testing::FakeIdentity;
    use super::*;

    fn service() -> AuthService {
        let hub = AuthHub::new();
        hub.spawn_listener();
        AuthService::new(Arc::new(FakeIdentity::default()), hub)
    }

    #[test]
    fn test_idp_provider_ids() {
        assert_eq!(IdpProvider::Google.provider_id(), "google.com");
        assert_eq!(
            serde_json::from_str::<IdpProvider>(r#""github""#).unwrap(),
            IdpProvider::Github
        );
    }

    #[tokio::test]
    async fn test_sign_in_then_resolve_token() {
        let auth = service();
        auth.sign_up("a@b.c", "password").await.unwrap();
        let session = auth.sign_in("a@b.c", "password").await.unwrap();

        let ctx = auth.resolve(Some(&session.id_token)).await;
        assert_eq!(ctx.user.unwrap().email.as_deref(), Some("a@b.c"));
        assert!(!ctx.loading);
    }

    #[tokio::test]
    async fn test_rejection_message_is_verbatim() {
        let auth = service();
        let err = auth.sign_in("nobody@b.c", "password").await.unwrap_err();
        assert_eq!(err.to_string(), "EMAIL_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unknown_token_is_anonymous() {
        let auth = service();
        let ctx = auth.resolve(Some("forged")).await;
        assert!(ctx.user.is_none());
        let ctx = auth.resolve(None).await;
        assert!(ctx.user.is_none());
    }

    #[tokio::test]
    async fn test_sign_out_stays_signed_out_while_provider_accepts_token() {
        let auth = service();
        let session = auth.sign_up("a@b.c", "password").await.unwrap();
        assert!(auth.resolve(Some(&session.id_token)).await.user.is_some());

        let mut events = auth.hub().subscribe();
        auth.sign_out(&session.id_token).await;
        assert!(matches!(events.recv().await, Ok(AuthEvent::SignedOut { .. })));
        auth.hub().settle().await;

        // FakeIdentity::lookup still accepts the token; the revocation must win.
        assert!(auth.resolve(Some(&session.id_token)).await.user.is_none());
        assert!(auth.resolve(Some(&session.id_token)).await.user.is_none());
        assert_eq!(auth.hub().signed_in_count().await, 0);
    }

    #[tokio::test]
    async fn test_signing_in_again_reinstates_token() {
        let auth = service();
        let session = auth.sign_up("a@b.c", "password").await.unwrap();
        auth.sign_out(&session.id_token).await;

        let again = auth.sign_in("a@b.c", "password").await.unwrap();
        assert_eq!(again.id_token, session.id_token);
        assert!(auth.resolve(Some(&again.id_token)).await.user.is_some());
    }

    #[tokio::test]
    async fn test_expired_sign_in_is_not_trusted() {
        let auth = service();
        auth.hub().publish(AuthEvent::SignedIn {
            id_token: "stale".into(),
            user: Identity {
                uid: "u1".into(),
                email: None,
                display_name: None,
                photo_url: None,
            },
            expires_at: Utc::now() - Duration::seconds(1),
        });
        auth.hub().settle().await;

        assert!(auth.resolve(Some("stale")).await.user.is_none());
    }

    #[test]
    fn test_token_expiry_reads_jwt_exp_claim() {
        let claims = URL_SAFE_NO_PAD.encode(r#"{"exp":2000000000,"sub":"u1"}"#);
        let token = format!("header.{claims}.signature");
        assert_eq!(token_expiry(&token).timestamp(), 2_000_000_000);
    }

    #[test]
    fn test_token_expiry_defaults_to_an_hour() {
        let expiry = token_expiry("token-uid1");
        let remaining = expiry - Utc::now();
        assert!(remaining > Duration::minutes(59) && remaining <= Duration::hours(1));
    }

    #[tokio::test]
    async fn test_expired_jwt_is_refused() {
        let auth = service();
        let claims = URL_SAFE_NO_PAD.encode(r#"{"exp":1000}"#);
        let expired = format!("h.{claims}.s");
        assert!(auth.resolve(Some(&expired)).await.user.is_none());
    }
}
