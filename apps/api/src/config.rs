use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub firebase_api_key: String,
    /// `false` when the model backend cannot guarantee schema-constrained output.
    /// Vocabulary lookup then falls back to labeled free-text parsing.
    pub structured_output: bool,
    pub port: u16,
    /// Roleplay sessions untouched for this long are dropped.
    pub session_idle_minutes: i64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            firebase_api_key: require_env("FIREBASE_API_KEY")?,
            structured_output: parse_flag(
                "LLM_STRUCTURED_OUTPUT",
                std::env::var("LLM_STRUCTURED_OUTPUT").ok().as_deref(),
                true,
            )?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            session_idle_minutes: std::env::var("ROLEPLAY_SESSION_IDLE_MINUTES")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u32>()
                .context("ROLEPLAY_SESSION_IDLE_MINUTES must be a whole number of minutes")?
                .into(),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_flag(key: &str, raw: Option<&str>, default: bool) -> Result<bool> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{key} must be a boolean, got '{other}'"),
    }
}
