use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::Config;
use crate::llm_client::LanguageModel;
use crate::roleplay::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Every flow goes through this. `LlmClient` in production.
    pub model: Arc<dyn LanguageModel>,
    pub auth: AuthService,
    pub sessions: SessionStore,
    pub config: Config,
}
