#![deny(unused)]
//! Administrative API for vibegate.
//!
//! Provides endpoints for agent creation and audit queries, authenticated
//! with the gateway's admin secret.

use axum::{
    extract::{Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use vibegate_core::{
    traits::{AgentRegistry, AuditSink},
    types::NewAgent,
};

const DEFAULT_AUDIT_LIMIT: usize = 50;

/// Admin API state.
pub struct AdminState {
    pub registry: Arc<dyn AgentRegistry>,
    pub audit: Arc<dyn AuditSink>,
    pub admin_token: Secret<String>,
}

/// Request body for agent creation.
#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    pub name: String,
    #[serde(default = "default_budget")]
    pub budget_limit_usd: f64,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
}

fn default_budget() -> f64 {
    10.0
}

fn default_rate_limit() -> u32 {
    60
}

/// Response for agent creation. The token appears here exactly once.
#[derive(Debug, Serialize)]
pub struct CreateAgentResponse {
    pub agent_id: String,
    pub token: String,
    pub note: String,
}

/// Query parameters for the audit listing.
#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// Authentication middleware: bearer token must equal the admin secret.
async fn auth_middleware(
    State(state): State<Arc<AdminState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    match bearer {
        Some(token) if token == state.admin_token.expose_secret() => Ok(next.run(req).await),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Create a new agent and issue its token.
async fn create_agent_handler(
    State(state): State<Arc<AdminState>>,
    Json(payload): Json<CreateAgentRequest>,
) -> Response {
    let params = NewAgent {
        name: payload.name,
        budget_limit_usd: payload.budget_limit_usd,
        rate_limit_per_minute: payload.rate_limit_per_minute,
    };

    match state.registry.create_agent(params).await {
        Ok(agent) => (
            StatusCode::CREATED,
            Json(CreateAgentResponse {
                agent_id: agent.id,
                token: agent.token,
                note: "Store this token securely; it is never shown again.".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Agent creation failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// List recent audit records, most recent first.
async fn list_audit_handler(
    State(state): State<Arc<AdminState>>,
    Query(query): Query<AuditQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);

    match state.audit.recent(limit).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Audit query failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Build the admin router with authentication applied to every route.
pub fn router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/admin/agents", post(create_agent_handler))
        .route("/admin/audit-records", get(list_audit_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
