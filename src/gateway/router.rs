//! HTTP router and handlers

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use gateway_core::Operation;
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{debug, warn};

use super::auth::{ANONYMOUS, Principal, ResolvedAuthConfig, auth_middleware};
use super::redaction::{RedactionState, redaction_middleware};
use crate::agent::{AgentOrchestrator, AgentRequest, AgentResponse, FailureKind};

/// Shared application state
pub struct AppState {
    /// Agent pipeline
    pub orchestrator: AgentOrchestrator,
    /// Authentication configuration
    pub auth_config: Arc<ResolvedAuthConfig>,
    /// Response redaction settings
    pub redaction: Arc<RedactionState>,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Maximum inbound body size in bytes
    pub max_body_size: usize,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_config = Arc::clone(&state.auth_config);
    let redaction = Arc::clone(&state.redaction);
    let request_timeout = state.request_timeout;
    let max_body_size = state.max_body_size;

    Router::new()
        .route("/health", get(health_handler))
        .route("/agent/run", post(run_handler))
        .route("/agent/operations", get(operations_handler))
        .layer(DefaultBodyLimit::max(max_body_size))
        // Authentication middleware (applied before other layers)
        .layer(middleware::from_fn_with_state(auth_config, auth_middleware))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        // Redaction must see the uncompressed body
        .layer(middleware::from_fn_with_state(redaction, redaction_middleware))
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "operations": state.orchestrator.catalog().len(),
    }))
}

/// GET /agent/operations - the allow-list as seen by the oracle
async fn operations_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Operation>> {
    Json(state.orchestrator.catalog().operations().to_vec())
}

/// POST /agent/run
async fn run_handler(
    State(state): State<Arc<AppState>>,
    principal: Option<Extension<Principal>>,
    headers: HeaderMap,
    body: Result<Json<AgentRequest>, JsonRejection>,
) -> (StatusCode, Json<AgentResponse>) {
    let user_id = principal.map_or_else(|| ANONYMOUS.to_string(), |Extension(p)| p.user_id);

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(user = %user_id, error = %rejection.body_text(), "Malformed agent request");
            let response = AgentResponse::failure(
                user_id,
                FailureKind::InvalidRequest,
                format!("Invalid request body: {}", rejection.body_text()),
            );
            return (StatusCode::BAD_REQUEST, Json(response));
        }
    };

    let credential = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    debug!(user = %user_id, has_credential = credential.is_some(), "Agent request received");

    let response = state
        .orchestrator
        .run(&request.prompt, credential, &user_id)
        .await;
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(response))
}
