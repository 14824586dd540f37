//! End-to-end tests for the recipe route, driven through the router with a
//! scripted upstream.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use recipe_relay::config::{Config, RecipeConfig};
use recipe_relay::recipe::prompt::OutputFormat;
use recipe_relay::server::recipe_api::{build_router, AppState};
use recipe_relay::server::streaming::STREAM_ERROR_MARKER;
use recipe_relay::upstream::scripted::{ScriptStep, ScriptedProvider};
use recipe_relay::upstream::Credential;

const ROUTE: &str = "/api/generate-recipes";

fn app_with(
    provider: Arc<ScriptedProvider>,
    credential: Option<&str>,
    recipes: RecipeConfig,
) -> Router {
    let config = Config {
        recipes,
        ..Config::default()
    };
    let state = AppState::new(
        Arc::new(config),
        provider,
        credential.and_then(Credential::new),
    );
    build_router(Arc::new(state))
}

fn app(provider: Arc<ScriptedProvider>) -> Router {
    app_with(provider, Some("sk-test"), RecipeConfig::default())
}

fn post(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(ROUTE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn pantry() -> String {
    json!({
        "items": [
            { "name": "Eggs", "quantity": "6", "expiration_date": "2026-10-20" },
            { "name": "Spinach" },
            { "name": "Feta", "quantity": "200 g" }
        ]
    })
    .to_string()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_streams_fragments_verbatim() {
    let provider = Arc::new(ScriptedProvider::from_fragments(["Recipe", " A"]));
    let response = app(provider.clone()).oneshot(post(pantry())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert_eq!(body_text(response).await, "Recipe A");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_warmup_fragment_precedes_output() {
    let provider = Arc::new(ScriptedProvider::from_fragments(["Recipe", " A"]));
    let recipes = RecipeConfig {
        output_format: OutputFormat::Markdown,
        warmup_fragment: Some("Thinking...\n\n".to_string()),
        ..RecipeConfig::default()
    };
    let response = app_with(provider, Some("sk-test"), recipes)
        .oneshot(post(pantry()))
        .await
        .unwrap();

    assert_eq!(body_text(response).await, "Thinking...\n\nRecipe A");
}

#[tokio::test]
async fn test_prompt_sent_upstream() {
    let provider = Arc::new(ScriptedProvider::from_fragments(["ok"]));
    let response = app(provider.clone()).oneshot(post(pantry())).await.unwrap();
    body_text(response).await;

    let sent = provider.last_request().unwrap();
    assert_eq!(sent.model, "claude-haiku-4-5");
    assert_eq!(sent.max_tokens, 2048);
    assert!(sent.prompt.contains(
        "- Eggs (6) [Expires: 2026-10-20]\n- Spinach\n- Feta (200 g)"
    ));
    assert!(sent.prompt.contains("raw JSON array"));
}

#[tokio::test]
async fn test_mid_stream_error_keeps_200() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        ScriptStep::Text("Recipe".to_string()),
        ScriptStep::Fail("connection reset".to_string()),
    ]));
    let response = app(provider).oneshot(post(pantry())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, format!("Recipe{STREAM_ERROR_MARKER}"));
}

#[tokio::test]
async fn test_non_text_events_skipped() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![
            ScriptStep::Event("message_start".to_string()),
            ScriptStep::Text("one".to_string()),
            ScriptStep::Event("ping".to_string()),
            ScriptStep::Text(" two".to_string()),
            ScriptStep::Event("message_stop".to_string()),
        ])
        .with_step_delay(Duration::from_millis(5)),
    );
    let response = app(provider).oneshot(post(pantry())).await.unwrap();

    assert_eq!(body_text(response).await, "one two");
}

#[tokio::test]
async fn test_malformed_json_is_400_without_upstream_call() {
    let provider = Arc::new(ScriptedProvider::from_fragments(["unused"]));
    let response = app(provider.clone()).oneshot(post("{\"items\": [")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid JSON body");
    assert!(body["details"].is_string());
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_missing_or_empty_items_is_400() {
    for body in [json!({}), json!({ "items": [] }), json!({ "items": {} }), json!({ "other": 1 })] {
        let provider = Arc::new(ScriptedProvider::from_fragments(["unused"]));
        let response = app(provider.clone()).oneshot(post(body.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(body_json(response).await, json!({ "error": "No items provided" }));
        assert_eq!(provider.calls(), 0);
    }
}

#[tokio::test]
async fn test_missing_credential_is_500_without_upstream_call() {
    let provider = Arc::new(ScriptedProvider::from_fragments(["unused"]));
    let response = app_with(provider.clone(), None, RecipeConfig::default())
        .oneshot(post(pantry()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "Server configuration error: Missing API Key" })
    );
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_validation_runs_before_credential_check() {
    let provider = Arc::new(ScriptedProvider::from_fragments(["unused"]));
    let response = app_with(provider, None, RecipeConfig::default())
        .oneshot(post("not json"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upstream_open_failure_is_500() {
    let provider = Arc::new(ScriptedProvider::failing_to_open("invalid x-api-key"));
    let response = app(provider.clone()).oneshot(post(pantry())).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("invalid x-api-key"));
    assert!(body.get("details").is_none());
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_health() {
    let provider = Arc::new(ScriptedProvider::default());
    let response = app_with(provider, None, RecipeConfig::default())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["provider"], "scripted");
    assert_eq!(body["output_format"], "json");
    assert_eq!(body["credential_configured"], false);
}
