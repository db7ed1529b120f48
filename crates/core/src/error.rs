//! Error types for vibegate.

use thiserror::Error;

/// Result type alias using vibegate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication failures raised while resolving an agent token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid agent token")]
    InvalidToken,

    #[error("agent is suspended")]
    AgentSuspended,

    #[error("budget limit exceeded")]
    BudgetExhausted,
}

/// Admission rejections raised by the policy checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("rate limit exceeded, slow down")]
    RateLimited,

    #[error("security policy violation: {0}")]
    PolicyViolation(String),
}

/// Failures from the downstream text-generation provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("upstream provider returned status {status}")]
    Provider { status: u16 },

    #[error("upstream service unavailable: {0}")]
    Unavailable(String),
}

/// Failures while settling usage against an agent's budget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("ledger store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Failures while writing or reading audit records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate audit record: {0}")]
    DuplicateRecord(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error type for vibegate.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid request error.
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable code for API error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auth(AuthError::InvalidToken) => "INVALID_TOKEN",
            Self::Auth(AuthError::AgentSuspended) => "AGENT_SUSPENDED",
            Self::Auth(AuthError::BudgetExhausted) => "BUDGET_EXHAUSTED",
            Self::Admission(AdmissionError::RateLimited) => "RATE_LIMITED",
            Self::Admission(AdmissionError::PolicyViolation(_)) => "POLICY_VIOLATION",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Ledger(_) => "LEDGER_ERROR",
            Self::Store(_) => "STORE_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Serialization(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
