pub mod health;
pub mod pages;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::auth::handlers as auth;
use crate::flows::handlers as flows;
use crate::roleplay::handlers as roleplay;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/navigation", get(pages::handle_navigation))
        // Learning features
        .route(
            "/api/v1/vocabulary/explain",
            post(flows::handle_explain_vocabulary),
        )
        .route(
            "/api/v1/pronunciation/feedback",
            post(flows::handle_pronunciation_feedback),
        )
        .route("/api/v1/grammar/check", post(flows::handle_grammar_check))
        .route("/api/v1/vocab-lists", post(flows::handle_generate_vocab_list))
        .route("/api/v1/roleplay/turn", post(flows::handle_roleplay_turn))
        // Roleplay sessions
        .route(
            "/api/v1/roleplay/scenarios",
            get(roleplay::handle_list_scenarios),
        )
        .route(
            "/api/v1/roleplay/sessions",
            post(roleplay::handle_create_session),
        )
        .route(
            "/api/v1/roleplay/sessions/:id",
            get(roleplay::handle_get_session).delete(roleplay::handle_delete_session),
        )
        .route(
            "/api/v1/roleplay/sessions/:id/scenario",
            put(roleplay::handle_start_scenario).delete(roleplay::handle_change_scenario),
        )
        .route(
            "/api/v1/roleplay/sessions/:id/turns",
            post(roleplay::handle_take_turn),
        )
        // Auth
        .route("/api/v1/auth/sign-up", post(auth::handle_sign_up))
        .route("/api/v1/auth/sign-in", post(auth::handle_sign_in))
        .route("/api/v1/auth/sign-in/idp", post(auth::handle_sign_in_with_idp))
        .route("/api/v1/auth/sign-out", post(auth::handle_sign_out))
        .route("/api/v1/auth/me", get(auth::handle_me))
        .merge(pages::page_routes())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::testing::FakeIdentity;
    use crate::auth::{AuthHub, AuthService};
    use crate::config::Config;
    use crate::llm_client::testing::ScriptedModel;
    use crate::llm_client::LlmError;
    use crate::roleplay::SessionStore;

    fn config(structured_output: bool) -> Config {
        Config {
            gemini_api_key: "test-gemini".into(),
            firebase_api_key: "test-firebase".into(),
            structured_output,
            port: 0,
            session_idle_minutes: 120,
            rust_log: "debug".into(),
        }
    }

    fn app_with(model: ScriptedModel, structured_output: bool) -> (Router, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        let hub = AuthHub::new();
        hub.spawn_listener();
        let state = AppState {
            model: model.clone(),
            auth: AuthService::new(Arc::new(FakeIdentity::default()), hub),
            sessions: SessionStore::default(),
            config: config(structured_output),
        };
        (build_router(state), model)
    }

    fn app(model: ScriptedModel) -> (Router, Arc<ScriptedModel>) {
        app_with(model, true)
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(ScriptedModel::new());
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["signedInUsers"], 0);
    }

    #[tokio::test]
    async fn test_grammar_check_returns_structured_result() {
        let (app, model) = app(ScriptedModel::new().reply(
            r#"{"correctedText": "She goes to school.", "explanation": "Third person singular takes -es."}"#,
        ));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/grammar/check",
            Some(json!({"text": "She go to school.", "languageCode": "es"})),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["correctedText"], "She goes to school.");
        assert!(model.requests()[0].prompt_text().contains("She go to school."));
    }

    #[tokio::test]
    async fn test_model_failure_returns_fixed_retry_message() {
        let (app, _) = app(ScriptedModel::new().fail(LlmError::Api {
            status: 503,
            message: "overloaded".into(),
        }));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/grammar/check",
            Some(json!({"text": "She go to school."})),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "LLM_ERROR");
        assert_eq!(
            body["error"]["message"],
            "Failed to get grammar assistance. Please try again."
        );
    }

    #[tokio::test]
    async fn test_empty_word_is_rejected_without_model_call() {
        let (app, model) = app(ScriptedModel::new());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/vocabulary/explain",
            Some(json!({"word": "   "})),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_vocabulary_structured_result_is_tagged() {
        let (app, _) = app(ScriptedModel::new().reply(
            r#"{"word": "happy", "meaningEnglish": "Feeling joy.", "exampleSentence": "I am happy."}"#,
        ));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/vocabulary/explain",
            Some(json!({"word": "happy"})),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "structured");
        assert_eq!(body["meaningEnglish"], "Feeling joy.");
    }

    #[tokio::test]
    async fn test_vocabulary_free_text_fallback_keeps_raw_text() {
        let (app, _) = app_with(ScriptedModel::new().reply("This word means happy."), false);
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/vocabulary/explain",
            Some(json!({"word": "glad"})),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "parsed");
        assert_eq!(body["rawExplanation"], "This word means happy.");
    }

    #[tokio::test]
    async fn test_pronunciation_rejects_plain_filename() {
        let (app, model) = app(ScriptedModel::new());
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/pronunciation/feedback",
            Some(json!({"text": "Hello", "userRecording": "hello.wav"})),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_vocab_list_generation() {
        let (app, _) = app(ScriptedModel::new().reply(
            r#"{"title": "Travel words", "items": [{"word": "ticket", "meaning": "A pass for travel."}]}"#,
        ));
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/vocab-lists",
            Some(json!({"request": "travel words for beginners"})),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"][0]["word"], "ticket");
    }

    #[tokio::test]
    async fn test_roleplay_session_round_trip() {
        let (app, _) = app(ScriptedModel::new()
            .reply(r#"{"botResponse": "Hot or iced?"}"#)
            .fail(LlmError::EmptyContent));

        let (status, session) = send(
            &app,
            Method::POST,
            "/api/v1/roleplay/sessions",
            Some(json!({"scenario": "Ordering food at a restaurant"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = session["id"].as_str().unwrap().to_string();
        let turns_uri = format!("/api/v1/roleplay/sessions/{id}/turns");

        let (status, report) = send(
            &app,
            Method::POST,
            &turns_uri,
            Some(json!({"utterance": "A coffee, please."})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["session"]["turns"].as_array().unwrap().len(), 3);
        assert!(report.get("error").is_none());

        // A failed model call is not an HTTP error: the apology joins the transcript.
        let (status, report) = send(
            &app,
            Method::POST,
            &turns_uri,
            Some(json!({"utterance": "Iced."})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["error"], "Failed to get bot response. Please try again.");
        assert_eq!(report["session"]["turns"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_roleplay_scenario_conflicts_and_missing_session() {
        let (app, _) = app(ScriptedModel::new());
        let (_, session) = send(&app, Method::POST, "/api/v1/roleplay/sessions", None, None).await;
        let id = session["id"].as_str().unwrap().to_string();
        assert_eq!(session["state"], "scenarioUnset");

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/v1/roleplay/sessions/{id}/turns"),
            Some(json!({"utterance": "Hi"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let scenario_uri = format!("/api/v1/roleplay/sessions/{id}/scenario");
        let (status, _) = send(
            &app,
            Method::PUT,
            &scenario_uri,
            Some(json!({"scenario": "Airport"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(
            &app,
            Method::PUT,
            &scenario_uri,
            Some(json!({"scenario": "Hotel"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/v1/roleplay/sessions/00000000-0000-0000-0000-000000000000",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_sign_up_then_me_then_sign_out() {
        let (app, _) = app(ScriptedModel::new());
        let (status, session) = send(
            &app,
            Method::POST,
            "/api/v1/auth/sign-up",
            Some(json!({"email": "learner@example.com", "password": "password"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let token = session["idToken"].as_str().unwrap().to_string();

        let (status, me) = send(&app, Method::GET, "/api/v1/auth/me", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["user"]["email"], "learner@example.com");
        assert_eq!(me["loading"], false);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/v1/auth/sign-out",
            None,
            Some(&token),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, me) = send(&app, Method::GET, "/api/v1/auth/me", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(me["user"].is_null());

        let (status, _) = send(&app, Method::POST, "/api/v1/auth/sign-out", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_provider_rejection_is_shown_verbatim() {
        let (app, _) = app(ScriptedModel::new());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/sign-in",
            Some(json!({"email": "ghost@example.com", "password": "password"})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "AUTH_ERROR");
        assert_eq!(body["error"]["message"], "EMAIL_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_explore_redirects_to_login_when_anonymous() {
        let (app, _) = app(ScriptedModel::new());
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/explore").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn test_explore_lists_features_when_signed_in() {
        let (app, _) = app(ScriptedModel::new());
        let (_, session) = send(
            &app,
            Method::POST,
            "/api/v1/auth/sign-up",
            Some(json!({"email": "learner@example.com", "password": "password"})),
            None,
        )
        .await;
        let token = session["idToken"].as_str().unwrap().to_string();

        let (status, page) = send(&app, Method::GET, "/explore", None, Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["features"].as_array().unwrap().len(), 5);

        let (status, nav) = send(&app, Method::GET, "/api/v1/navigation", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(nav.as_array().unwrap().len(), 7);
    }
}
