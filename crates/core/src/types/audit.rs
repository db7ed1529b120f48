//! Append-only audit trail types.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Terminal status of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditStatus {
    /// Rejected by the content screen before forwarding.
    Blocked,
    /// Forwarded and completed.
    Success,
    /// Forwarded but the upstream call failed.
    Failed,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "BLOCKED",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for AuditStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BLOCKED" => Ok(Self::Blocked),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown audit status: {other}")),
        }
    }
}

/// One record per admission attempt, immutable once written.
///
/// Usage fields (`tokens_used`, `latency_ms`, `cost_usd`) are present only
/// when a downstream call was actually made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique per attempt; the natural key of the audit store.
    pub request_id: String,
    /// Owning agent. Weak reference: the record survives deactivation.
    pub agent_id: String,
    /// Inbound route the attempt arrived on.
    pub endpoint: String,
    /// Requested model, when the request got far enough to matter.
    pub model: Option<String>,
    /// The post-redaction text that was forwarded. Never the raw input.
    pub sanitized_input: Option<String>,
    /// Terminal status.
    pub status: AuditStatus,
    /// Triggered rule names, in detection order, each at most once.
    pub risk_flags: Vec<String>,
    /// Total tokens reported by the upstream provider.
    pub tokens_used: Option<u64>,
    /// Pipeline latency, entry to just before the audit write.
    pub latency_ms: Option<f64>,
    /// Settled cost in USD.
    pub cost_usd: Option<f64>,
    /// Creation time, RFC 3339. Non-decreasing in insertion order.
    pub timestamp: String,
}

impl AuditRecord {
    /// Create a record with the given terminal status, stamped now.
    pub fn new(
        request_id: impl Into<String>,
        agent_id: impl Into<String>,
        endpoint: impl Into<String>,
        status: AuditStatus,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            agent_id: agent_id.into(),
            endpoint: endpoint.into(),
            model: None,
            sanitized_input: None,
            status,
            risk_flags: Vec::new(),
            tokens_used: None,
            latency_ms: None,
            cost_usd: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Attach the requested model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Attach the sanitized input that was forwarded.
    pub fn with_sanitized_input(mut self, input: impl Into<String>) -> Self {
        self.sanitized_input = Some(input.into());
        self
    }

    /// Attach triggered rule names.
    pub fn with_risk_flags(mut self, flags: Vec<String>) -> Self {
        self.risk_flags = flags;
        self
    }

    /// Attach the measured pipeline latency.
    pub fn with_latency_ms(mut self, latency_ms: f64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Attach token usage and settled cost.
    pub fn with_usage(mut self, tokens_used: u64, cost_usd: f64) -> Self {
        self.tokens_used = Some(tokens_used);
        self.cost_usd = Some(cost_usd);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [AuditStatus::Blocked, AuditStatus::Success, AuditStatus::Failed] {
            let parsed: AuditStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("PENDING".parse::<AuditStatus>().is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let record = AuditRecord::new("req-1", "agent-1", "/v1/chat/completions", AuditStatus::Blocked)
            .with_risk_flags(vec!["PROMPT_INJECTION".into()]);

        assert_eq!(record.status, AuditStatus::Blocked);
        assert_eq!(record.risk_flags, vec!["PROMPT_INJECTION"]);
        assert!(record.tokens_used.is_none());
        assert!(record.latency_ms.is_none());
        assert!(record.cost_usd.is_none());
        assert!(record.model.is_none());
    }
}
