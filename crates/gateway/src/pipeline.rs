//! The admission pipeline.
//!
//! Per-request state machine: AUTHENTICATING → RATE_CHECKING → SCREENING →
//! FORWARDING → SETTLING → AUDITED, with early exit on block or failure.
//! Auth and rate rejections are not audited; blocked, failed, and
//! successful runs write exactly one record each.

use std::sync::Arc;
use std::time::Instant;

use vibegate_core::{
    error::AdmissionError,
    traits::{AuditSink, BudgetLedger, IdentityStore, RateAdmitter, UpstreamClient},
    types::{AuditRecord, AuditStatus, CompletionRequest, CompletionResponse},
    Error, Result,
};
use vibegate_governance::ContentScreen;
use vibegate_upstream::CostModel;

/// The inbound route guarded by the pipeline, recorded on audit entries.
pub const CHAT_ENDPOINT: &str = "/v1/chat/completions";

/// Orchestrates the admission checks for each request.
///
/// Every collaborator is injected at construction; a pipeline instance
/// carries no per-request state and is shared across all in-flight
/// requests.
pub struct AdmissionPipeline {
    identity: Arc<dyn IdentityStore>,
    rate: Arc<dyn RateAdmitter>,
    screen: ContentScreen,
    upstream: Arc<dyn UpstreamClient>,
    ledger: Arc<dyn BudgetLedger>,
    audit: Arc<dyn AuditSink>,
    cost: CostModel,
}

impl AdmissionPipeline {
    pub fn new(
        identity: Arc<dyn IdentityStore>,
        rate: Arc<dyn RateAdmitter>,
        screen: ContentScreen,
        upstream: Arc<dyn UpstreamClient>,
        ledger: Arc<dyn BudgetLedger>,
        audit: Arc<dyn AuditSink>,
        cost: CostModel,
    ) -> Self {
        Self {
            identity,
            rate,
            screen,
            upstream,
            ledger,
            audit,
            cost,
        }
    }

    /// Run one request through the pipeline.
    ///
    /// Returns the completion, or the terminal error of the stage that
    /// rejected the request. The sanitized text permanently replaces the
    /// last message's content before forwarding; the original is never
    /// forwarded or persisted.
    pub async fn run(
        &self,
        token: &str,
        request_id: &str,
        mut request: CompletionRequest,
    ) -> Result<CompletionResponse> {
        let started = Instant::now();

        // AUTHENTICATING. Failures are not audited: identity is unknown or
        // the request is not billable.
        let agent = self.identity.resolve(token).await?;

        // RATE_CHECKING. Rejections mirror auth failures and are not
        // audited either.
        if !self
            .rate
            .try_admit(&agent.id, agent.rate_limit_per_minute)
            .await?
        {
            return Err(AdmissionError::RateLimited.into());
        }

        let content = request
            .last_content()
            .ok_or_else(|| Error::invalid_request("messages must not be empty"))?
            .to_string();

        // SCREENING. Injection blocks before any redaction or forwarding.
        if self.screen.screen_for_injection(&content) {
            tracing::warn!(
                agent_id = %agent.id,
                request_id = request_id,
                "Blocked prompt injection attempt"
            );
            self.write_audit(
                AuditRecord::new(request_id, &agent.id, CHAT_ENDPOINT, AuditStatus::Blocked)
                    .with_risk_flags(vec!["PROMPT_INJECTION".to_string()]),
            )
            .await;
            return Err(AdmissionError::PolicyViolation("malicious prompt detected".into()).into());
        }

        let (sanitized, risk_flags) = self.screen.redact(&content);
        if let Some(last) = request.messages.last_mut() {
            last.content = sanitized.clone();
        }

        // FORWARDING.
        let response = match self.upstream.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.write_audit(
                    AuditRecord::new(request_id, &agent.id, CHAT_ENDPOINT, AuditStatus::Failed)
                        .with_model(request.model.as_str())
                        .with_sanitized_input(sanitized.as_str())
                        .with_risk_flags(risk_flags)
                        .with_latency_ms(elapsed_ms(started)),
                )
                .await;
                return Err(e);
            }
        };

        // SETTLING. A ledger failure is a billing-accuracy concern, never a
        // reason to withhold the already-obtained completion.
        let tokens_used = response.usage.total_tokens;
        let cost_usd = self.cost.cost_for(tokens_used);
        if let Err(e) = self.ledger.settle(&agent.id, cost_usd).await {
            tracing::warn!(
                agent_id = %agent.id,
                request_id = request_id,
                error = %e,
                "Budget settlement failed; completion returned anyway"
            );
        }

        // AUDITED. Latency covers pipeline entry to just before this write.
        self.write_audit(
            AuditRecord::new(request_id, &agent.id, CHAT_ENDPOINT, AuditStatus::Success)
                .with_model(request.model.as_str())
                .with_sanitized_input(sanitized.as_str())
                .with_risk_flags(risk_flags)
                .with_usage(tokens_used, cost_usd)
                .with_latency_ms(elapsed_ms(started)),
        )
        .await;

        Ok(response)
    }

    /// Audit writes are best-effort: the caller-facing result stands even
    /// when the write fails, but the gap must be loud in the logs.
    async fn write_audit(&self, record: AuditRecord) {
        if let Err(e) = self.audit.record(record).await {
            tracing::error!(error = %e, "Audit write failed; audit trail has a gap");
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
