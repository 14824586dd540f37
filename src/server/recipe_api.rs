//! Recipe generation HTTP API.
//!
//! - POST /api/generate-recipes (path configurable)
//! - GET /health

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{Config, HEALTH_ROUTE};
use crate::recipe::prompt::{OutputFormat, RecipeProfile};
use crate::recipe::{RecipeError, RecipeRequest};
use crate::server::streaming::relay_response;
use crate::upstream::{CompletionRequest, Credential, TextStreamProvider, UpstreamError};

/// Application state shared across handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn TextStreamProvider>,
    pub credential: Option<Credential>,
    pub profile: RecipeProfile,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        provider: Arc<dyn TextStreamProvider>,
        credential: Option<Credential>,
    ) -> Self {
        let profile = config.recipes.profile();
        Self {
            config,
            provider,
            credential,
            profile,
            start_time: Instant::now(),
        }
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route(&state.config.server.route, post(generate_recipes))
        .route(HEALTH_ROUTE, get(health))
        .layer(TraceLayer::new_for_http());

    let router = if state.config.server.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

// ─── Errors ────────────────────────────────────────────────────────────────

/// Failures that happen before any response body is sent.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Rejected(#[from] RecipeError),

    #[error("Server configuration error: Missing API Key")]
    MissingCredential,

    #[error(transparent)]
    UpstreamCall(#[from] UpstreamError),
}

/// JSON error payload.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingCredential | ApiError::UpstreamCall(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Rejected(RecipeError::InvalidBody(details)) => ErrorBody {
                error: "Invalid JSON body".to_string(),
                details: Some(details.clone()),
            },
            other => ErrorBody {
                error: other.to_string(),
                details: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn generate_recipes(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4().to_string();

    let request = RecipeRequest::from_body(&body).inspect_err(|e| {
        warn!(request_id = request_id, error = %e, "Rejected recipe request");
    })?;

    info!(
        request_id = request_id,
        items = request.len(),
        "Received recipe request"
    );

    let Some(credential) = state.credential.as_ref() else {
        error!(
            request_id = request_id,
            env = state.config.upstream.credential_env,
            "Missing upstream API key"
        );
        return Err(ApiError::MissingCredential);
    };

    let completion = CompletionRequest {
        model: state.config.upstream.model.clone(),
        prompt: state.profile.build_prompt(&request),
        max_tokens: state.config.upstream.max_tokens,
    };

    info!(
        request_id = request_id,
        provider = state.provider.name(),
        model = completion.model,
        "Calling upstream"
    );

    let events = state
        .provider
        .open_stream(credential, completion)
        .await
        .inspect_err(|e| error!(request_id = request_id, error = %e, "Upstream call failed"))?;

    info!(request_id = request_id, "Upstream stream created");

    Ok(relay_response(
        events,
        state.profile.warmup().map(str::to_string),
        request_id,
    ))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub provider: String,
    pub output_format: OutputFormat,
    pub credential_configured: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        provider: state.provider.name().to_string(),
        output_format: state.profile.output_format(),
        credential_configured: state.credential.is_some(),
    })
}
