mod auth;
mod config;
mod errors;
mod flows;
mod llm_client;
mod models;
mod roleplay;
mod routes;
mod state;

use anyhow::Result;
use chrono::Duration;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::firebase::FirebaseIdentity;
use crate::auth::{AuthHub, AuthService};
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::roleplay::SessionStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Linguamate API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let llm = LlmClient::new(config.gemini_api_key.clone())?;
    info!(
        "LLM client initialized (model: {}, structured output: {})",
        llm_client::MODEL,
        config.structured_output
    );

    // Initialize identity provider and the auth listener (exactly one per process)
    let identity = FirebaseIdentity::new(config.firebase_api_key.clone())?;
    let hub = AuthHub::new();
    hub.spawn_listener();
    info!("Identity provider initialized");

    let state = AppState {
        model: Arc::new(llm),
        auth: AuthService::new(Arc::new(identity), hub),
        sessions: SessionStore::new(Duration::minutes(config.session_idle_minutes)),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
