//! Firebase Authentication over the Identity Toolkit REST API.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::auth::{AuthError, AuthSession, IdentityProvider, Identity, IdpCredential, IdpProvider};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1/accounts";
/// Redirect URI reported to signInWithIdp; the credential was already obtained client-side.
const IDP_REQUEST_URI: &str = "http://localhost";
const DEFAULT_EXPIRES_IN: u64 = 3600;
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct FirebaseIdentity {
    client: Client,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: &'a str,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

/// Shared shape of signUp / signInWithPassword / signInWithIdp replies.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirebaseError {
    error: FirebaseErrorBody,
}

#[derive(Debug, Deserialize)]
struct FirebaseErrorBody {
    message: String,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        AuthSession {
            expires_in: self
                .expires_in
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_EXPIRES_IN),
            user: Identity {
                uid: self.local_id,
                email: self.email,
                display_name: self.display_name.filter(|n| !n.is_empty()),
                photo_url: self.photo_url,
            },
            id_token: self.id_token,
            refresh_token: self.refresh_token,
        }
    }
}

impl FirebaseIdentity {
    pub fn new(api_key: String) -> Result<Self, AuthError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            api_key,
        })
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T, AuthError> {
        let url = format!("{IDENTITY_TOOLKIT_URL}:{method}");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            debug!("Identity provider returned {status} for {method}");
            return Err(AuthError::Rejected(provider_message(&text)));
        }

        serde_json::from_str(&text).map_err(|e| AuthError::Protocol(format!("{method}: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: TokenResponse = self.post("signUp", &body).await?;
        Ok(response.into_session())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let response: TokenResponse = self.post("signInWithPassword", &body).await?;
        Ok(response.into_session())
    }

    async fn sign_in_with_idp(
        &self,
        provider: IdpProvider,
        credential: &IdpCredential,
    ) -> Result<AuthSession, AuthError> {
        let post_body = idp_post_body(provider, credential)?;
        let body = IdpRequest {
            post_body: &post_body,
            request_uri: IDP_REQUEST_URI,
            return_secure_token: true,
            return_idp_credential: true,
        };
        let response: TokenResponse = self.post("signInWithIdp", &body).await?;
        Ok(response.into_session())
    }

    async fn lookup(&self, id_token: &str) -> Result<Identity, AuthError> {
        let response: LookupResponse = self.post("lookup", &LookupRequest { id_token }).await?;
        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| AuthError::Rejected("USER_NOT_FOUND".to_string()))?;
        Ok(Identity {
            uid: user.local_id,
            email: user.email,
            display_name: user.display_name.filter(|n| !n.is_empty()),
            photo_url: user.photo_url,
        })
    }
}

/// Form-encoded credential for signInWithIdp, e.g. `id_token=...&providerId=google.com`.
fn idp_post_body(provider: IdpProvider, credential: &IdpCredential) -> Result<String, AuthError> {
    let mut url = Url::parse(IDP_REQUEST_URI).map_err(|e| AuthError::Protocol(e.to_string()))?;
    {
        let mut pairs = url.query_pairs_mut();
        match (&credential.id_token, &credential.access_token) {
            (Some(token), _) => pairs.append_pair("id_token", token),
            (None, Some(token)) => pairs.append_pair("access_token", token),
            (None, None) => {
                return Err(AuthError::Rejected(
                    "An id token or access token from the provider is required".to_string(),
                ))
            }
        };
        pairs.append_pair("providerId", provider.provider_id());
    }
    Ok(url.query().unwrap_or_default().to_string())
}

/// Firebase puts a code like `EMAIL_EXISTS` or `INVALID_PASSWORD : detail` in `error.message`.
fn provider_message(body: &str) -> String {
    serde_json::from_str::<FirebaseError>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
