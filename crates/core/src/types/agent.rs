//! Registered caller identity and policy limits.

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// A registered caller, subject to rate and budget policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Opaque unique identifier, immutable.
    pub id: String,
    /// Display label.
    pub name: String,
    /// Secret bearer credential, issued once at creation.
    pub token: String,
    /// Ceiling on requests per trailing 60 seconds.
    pub rate_limit_per_minute: u32,
    /// Total budget ceiling in USD.
    pub budget_total_usd: f64,
    /// Accumulated settled usage in USD.
    pub budget_used_usd: f64,
    /// Inactive agents are rejected regardless of budget or rate state.
    pub active: bool,
    /// Creation time, RFC 3339.
    pub created_at: String,
}

impl Agent {
    /// Whether the agent's settled usage has reached its ceiling.
    ///
    /// Checked as a fast-path rejection at token resolution; settlement
    /// remains the authoritative accounting.
    pub fn budget_exhausted(&self) -> bool {
        self.budget_used_usd >= self.budget_total_usd
    }

    /// Resolution-time admission checks, shared by every identity store.
    pub fn ensure_admissible(&self) -> std::result::Result<(), AuthError> {
        if !self.active {
            return Err(AuthError::AgentSuspended);
        }
        if self.budget_exhausted() {
            return Err(AuthError::BudgetExhausted);
        }
        Ok(())
    }

    /// Issue a fresh agent from an admin creation request.
    ///
    /// The token is generated here and never reissued.
    pub fn issue(params: &NewAgent) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: params.name.clone(),
            token: generate_token(),
            rate_limit_per_minute: params.rate_limit_per_minute,
            budget_total_usd: params.budget_limit_usd,
            budget_used_usd: 0.0,
            active: true,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Parameters for creating a new agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAgent {
    /// Display label.
    pub name: String,
    /// Budget ceiling in USD.
    pub budget_limit_usd: f64,
    /// Requests-per-minute ceiling.
    pub rate_limit_per_minute: u32,
}

fn generate_token() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(22)
        .map(char::from)
        .collect();
    format!("vg-{suffix}")
}
