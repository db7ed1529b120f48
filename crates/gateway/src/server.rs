//! Axum-based HTTP server for the gateway.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use vibegate_admin::AdminState;
use vibegate_core::{
    error::{AdmissionError, AuthError},
    types::CompletionRequest,
    Error, Result,
};

use crate::pipeline::{AdmissionPipeline, CHAT_ENDPOINT};

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Enable CORS.
    pub enable_cors: bool,
    /// Enable request tracing.
    pub enable_tracing: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            enable_tracing: true,
        }
    }
}

/// Shared application state.
pub struct AppState {
    pipeline: AdmissionPipeline,
}

/// Gateway server.
pub struct GatewayServer {
    config: GatewayConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
    admin: Option<Arc<AdminState>>,
}

impl GatewayServer {
    /// Create a new gateway server around an assembled pipeline.
    pub fn new(config: GatewayConfig, pipeline: AdmissionPipeline) -> Self {
        Self {
            config,
            state: Arc::new(AppState { pipeline }),
            metrics_handle: None,
            admin: None,
        }
    }

    /// Mount the admin API.
    pub fn with_admin(mut self, admin: Arc<AdminState>) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    pub fn build_router(&self) -> Router {
        let mut router: Router = Router::new()
            .route("/health", get(health_handler))
            .route(CHAT_ENDPOINT, post(completions_handler))
            .with_state(self.state.clone());

        if let Some(admin) = &self.admin {
            router = router.merge(vibegate_admin::router(admin.clone()));
        }

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        if self.config.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Run the server.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::internal(format!("Failed to bind: {}", e)))?;

        tracing::info!(addr = %addr, "Gateway server starting");

        axum::serve(listener, self.build_router())
            .await
            .map_err(|e| Error::internal(format!("Server error: {}", e)))?;

        Ok(())
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status.
    pub status: String,
    /// Version.
    pub version: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Request ID for correlation with audit records and logs.
    pub request_id: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Completion proxy handler: bearer auth, then the admission pipeline.
async fn completions_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CompletionRequest>,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    let token = match bearer_token(&headers) {
        Some(token) => token.to_string(),
        None => {
            track(started, StatusCode::UNAUTHORIZED);
            return error_response(
                StatusCode::UNAUTHORIZED,
                "MISSING_TOKEN",
                "missing bearer token",
                &request_id,
            );
        }
    };

    match state.pipeline.run(&token, &request_id, payload).await {
        Ok(completion) => {
            vibegate_governance::track_tokens(
                &completion.model,
                completion.usage.prompt_tokens,
                completion.usage.completion_tokens,
            );
            track(started, StatusCode::OK);
            (StatusCode::OK, Json(completion)).into_response()
        }
        Err(e) => {
            let status = status_for(&e);
            tracing::debug!(
                request_id = %request_id,
                code = e.code(),
                status = status.as_u16(),
                "Request rejected"
            );
            track(started, status);
            error_response(status, e.code(), &e.to_string(), &request_id)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn error_response(status: StatusCode, code: &str, message: &str, request_id: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: request_id.to_string(),
        }),
    )
        .into_response()
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::Auth(AuthError::InvalidToken) => StatusCode::UNAUTHORIZED,
        Error::Auth(AuthError::AgentSuspended) => StatusCode::FORBIDDEN,
        Error::Auth(AuthError::BudgetExhausted) => StatusCode::PAYMENT_REQUIRED,
        Error::Admission(AdmissionError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
        Error::Admission(AdmissionError::PolicyViolation(_)) => StatusCode::BAD_REQUEST,
        Error::Upstream(_) => StatusCode::BAD_GATEWAY,
        Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn track(started: Instant, status: StatusCode) {
    vibegate_governance::track_request(
        "POST",
        CHAT_ENDPOINT,
        status.as_u16(),
        started.elapsed().as_secs_f64(),
    );
}
