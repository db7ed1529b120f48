//! Core traits for vibegate.
//!
//! These traits define the contracts between the admission pipeline and its
//! collaborators. Implementations live in the store, governance, and
//! upstream crates; the pipeline only sees `Arc<dyn Trait>`.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Agent, AuditRecord, CompletionRequest, CompletionResponse, NewAgent};

// =============================================================================
// Identity & Administration
// =============================================================================

/// Token-to-agent resolution.
///
/// Read-only. Fails with `AuthError::InvalidToken` for an unknown token,
/// `AuthError::AgentSuspended` for an inactive agent, and
/// `AuthError::BudgetExhausted` when settled usage has reached the ceiling
/// (a cheap pre-filter; settlement remains the authoritative accounting).
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Agent>;
}

/// Administrative agent management.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Create an agent and issue its token. The token is never reissued.
    async fn create_agent(&self, params: NewAgent) -> Result<Agent>;
}

// =============================================================================
// Admission Policy
// =============================================================================

/// Request-frequency admission check.
///
/// The shipped implementation is process-local; this trait is the seam for a
/// shared-store implementation when the gateway runs as multiple replicas.
#[async_trait]
pub trait RateAdmitter: Send + Sync {
    /// Admit or reject one request for the agent under the given ceiling.
    /// Admitted requests are recorded; rejected ones are not.
    async fn try_admit(&self, agent_id: &str, limit_per_minute: u32) -> Result<bool>;
}

// =============================================================================
// Ledger & Audit
// =============================================================================

/// Per-agent monetary usage tracking.
#[async_trait]
pub trait BudgetLedger: Send + Sync {
    /// Atomically add `cost_usd` to the agent's settled usage and return the
    /// new total. Budget is a soft ceiling: a request already in flight
    /// always settles, even past the ceiling.
    async fn settle(&self, agent_id: &str, cost_usd: f64) -> Result<f64>;
}

/// Append-only record of admission outcomes.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Insert one record. A duplicate `request_id` is a programming error
    /// and fails with `StoreError::DuplicateRecord`.
    async fn record(&self, record: AuditRecord) -> Result<()>;

    /// Most-recent-first listing, at most `limit` records.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>>;
}

// =============================================================================
// Upstream Provider
// =============================================================================

/// The downstream text-generation provider.
///
/// External collaborator: an opaque call returning a completion plus usage
/// metrics, or an `UpstreamError`. Retry policy, if any, belongs here, not
/// in the pipeline.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse>;
}
