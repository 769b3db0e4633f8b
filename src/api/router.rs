use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::health;
use super::middleware::{logging_middleware, metrics_middleware, require_api_key};
use super::rest;
use super::state::AppState;

/// Create the full router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    let api = rest::create_rest_router().layer(middleware::from_fn_with_state(
        state.clone(),
        require_api_key,
    ));

    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Chain, agent and command API
        .nest("/api", api)
        // Add state and middleware
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::{Agent, AgentName, LlmProvider};
    use crate::infrastructure::storage::StorageFactory;

    async fn app_with(config: AppConfig, provider: MockLlmProvider) -> Router {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        providers.insert("mock".to_string(), Arc::new(provider));

        let state = crate::build_app_state(&config, &StorageFactory::InMemory, providers)
            .await
            .unwrap();
        create_router_with_state(state)
    }

    async fn app() -> Router {
        let mut config = AppConfig::default();
        config.agents = vec![
            Agent::new(AgentName::new("writer").unwrap(), "mock", "mock-model"),
            Agent::new(AgentName::new("tools").unwrap(), "mock", "mock-model")
                .with_commands(vec!["echo".to_string()]),
        ];
        app_with(config, MockLlmProvider::new("mock")).await
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    async fn create_digest(app: &Router) {
        let (status, _) = send(
            app,
            Method::POST,
            "/api/chain",
            Some(json!({
                "name": "digest",
                "steps": [
                    {"step_number": 1, "agent_name": "tools", "step_type": "command",
                     "command_name": "echo", "args": "{user_input}"},
                    {"step_number": 2, "agent_name": "writer", "step_type": "prompt",
                     "prompt": "Summarize {STEP1} for {audience}"}
                ]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let app = app().await;

        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, Method::GET, "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"].as_array().unwrap().len(), 2);

        let (status, _) = send(&app, Method::GET, "/live", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_get_and_list_chain() {
        let app = app().await;
        create_digest(&app).await;

        let (status, body) = send(&app, Method::GET, "/api/chain/digest", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step_count"], 2);
        assert_eq!(body["steps"][0]["step_type"], "command");

        let (_, body) = send(&app, Method::GET, "/api/chain", None).await;
        assert_eq!(body["total"], 1);
    }

    #[tokio::test]
    async fn test_duplicate_chain_is_conflict() {
        let app = app().await;
        create_digest(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chain",
            Some(json!({"name": "digest"})),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "name_conflict");
    }

    #[tokio::test]
    async fn test_missing_chain_is_not_found() {
        let app = app().await;

        let (status, body) = send(&app, Method::GET, "/api/chain/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found_error");
    }

    #[tokio::test]
    async fn test_run_chain_with_all_responses() {
        let app = app().await;
        create_digest(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chain/digest",
            Some(json!({
                "user_input": "quarterly report",
                "all_responses": true,
                "args": {"audience": "executives"}
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"], "Summarize quarterly report for executives");
        assert_eq!(body["responses"]["1"]["output"], "quarterly report");
        assert_eq!(body["responses"]["2"]["agent_name"], "writer");
        assert_eq!(body["failed_steps"], 0);
    }

    #[tokio::test]
    async fn test_run_chain_hides_responses_by_default() {
        let app = app().await;
        create_digest(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chain/digest",
            Some(json!({"user_input": "notes"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.get("responses").is_none());
    }

    #[tokio::test]
    async fn test_run_single_step_uses_supplied_outputs() {
        let app = app().await;
        create_digest(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chain/digest/run/step/2",
            Some(json!({
                "user_input": "ignored",
                "step_outputs": {"1": "cached text"}
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["output"], "Summarize cached text for {audience}");
    }

    #[tokio::test]
    async fn test_run_out_of_range_step() {
        let app = app().await;
        create_digest(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chain/digest/run/step/7",
            Some(json!({"user_input": "x"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "out_of_range");
    }

    #[tokio::test]
    async fn test_step_editing_routes() {
        let app = app().await;
        create_digest(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chain/digest/step",
            Some(json!({"step_number": 1, "agent_name": "writer", "step_type": "prompt", "prompt": "first"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step_count"], 3);

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/api/chain/digest/step/move",
            Some(json!({"old_step_number": 1, "new_step_number": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["steps"][2]["prompt"], "first");

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/chain/digest/step/3",
            Some(json!({"agent_name": "writer", "step_type": "prompt", "prompt": "last"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["steps"][2]["prompt"], "last");

        let (status, body) = send(&app, Method::DELETE, "/api/chain/digest/step/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step_count"], 2);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chain/digest/step",
            Some(json!({"step_number": 9, "agent_name": "writer", "step_type": "prompt", "prompt": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_position");
    }

    #[tokio::test]
    async fn test_rename_and_delete_chain() {
        let app = app().await;
        create_digest(&app).await;

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/chain/digest",
            Some(json!({"new_name": "summary"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "summary");
        assert_eq!(body["step_count"], 2);

        let (status, _) = send(&app, Method::DELETE, "/api/chain/summary", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::GET, "/api/chain/summary", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_args_export_and_import() {
        let app = app().await;
        create_digest(&app).await;

        let (status, body) = send(&app, Method::GET, "/api/chain/digest/args", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["args"], json!(["audience"]));

        let (status, mut document) =
            send(&app, Method::GET, "/api/chain/digest/export", None).await;
        assert_eq!(status, StatusCode::OK);

        document["name"] = json!("digest-copy");
        let (status, body) = send(&app, Method::POST, "/api/chain/import", Some(document.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["step_count"], 2);

        let (status, _) = send(&app, Method::POST, "/api/chain/import", Some(document.clone())).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/chain/import?overwrite=true",
            Some(document),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_cyclic_chain_is_unprocessable() {
        let app = app().await;
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/chain/import",
            Some(json!({
                "name": "loop",
                "steps": [{"step_number": 1, "agent_name": "writer", "step_type": "chain",
                           "chain_name": "loop", "input": "{user_input}"}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chain/loop",
            Some(json!({"user_input": "x"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "cyclic_chain_reference");
    }

    #[tokio::test]
    async fn test_agent_routes() {
        let app = app().await;

        let (_, body) = send(&app, Method::GET, "/api/agent", None).await;
        assert_eq!(body["total"], 2);

        let (status, body) = send(
            &app,
            Method::PUT,
            "/api/agent/critic",
            Some(json!({"provider": "mock", "model": "m2", "system_prompt": "Be harsh"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["system_prompt"], "Be harsh");

        let (status, _) = send(
            &app,
            Method::PUT,
            "/api/agent/critic",
            Some(json!({"provider": "unknown", "model": "m2"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::DELETE, "/api/agent/critic", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::GET, "/api/agent/critic", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_command_catalog() {
        let app = app().await;

        let (status, body) = send(&app, Method::GET, "/api/command", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 3);

        let names: Vec<&str> = body["commands"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["name"].as_str())
            .collect();
        assert!(names.contains(&"echo"));
        assert!(names.contains(&"http_get"));
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let app = app().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chain",
            Some(json!({"description": "no name"})),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "json_parse_error");
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let mut config = AppConfig::default();
        config.auth.api_key = Some("chain-secret".to_string());
        let app = app_with(config, MockLlmProvider::new("mock")).await;

        let (status, _) = send(&app, Method::GET, "/api/chain", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/chain")
            .header("x-api-key", "chain-secret")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, _) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
