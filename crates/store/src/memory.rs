//! In-memory store implementation using DashMap.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Mutex;

use vibegate_core::{
    error::{AuthError, LedgerError, StoreError},
    traits::{AgentRegistry, AuditSink, BudgetLedger, IdentityStore},
    types::{Agent, AuditRecord, NewAgent},
    Error, Result,
};

/// In-memory store for tests and ephemeral deployments.
///
/// Agents live in a `DashMap` keyed by ID with a token index beside it;
/// settlement mutates the agent under the map's entry guard, so concurrent
/// settlements for the same agent serialize while different agents proceed
/// independently. Audit records keep insertion order in a single `Vec`.
pub struct InMemoryStore {
    agents: DashMap<String, Agent>,
    tokens: DashMap<String, String>,
    records: Mutex<Vec<AuditRecord>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            agents: DashMap::new(),
            tokens: DashMap::new(),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Number of registered agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Flip an agent's active flag. Administrative substitute for deletion.
    pub fn set_active(&self, agent_id: &str, active: bool) -> Result<()> {
        let mut agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| Error::Ledger(LedgerError::UnknownAgent(agent_id.to_string())))?;
        agent.active = active;
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for InMemoryStore {
    async fn resolve(&self, token: &str) -> Result<Agent> {
        let agent_id = self
            .tokens
            .get(token)
            .map(|r| r.value().clone())
            .ok_or(AuthError::InvalidToken)?;

        let agent = self
            .agents
            .get(&agent_id)
            .map(|r| r.value().clone())
            .ok_or(AuthError::InvalidToken)?;

        agent.ensure_admissible()?;
        Ok(agent)
    }
}

#[async_trait]
impl AgentRegistry for InMemoryStore {
    async fn create_agent(&self, params: NewAgent) -> Result<Agent> {
        let agent = Agent::issue(&params);
        self.tokens.insert(agent.token.clone(), agent.id.clone());
        self.agents.insert(agent.id.clone(), agent.clone());
        tracing::info!(agent_id = %agent.id, name = %agent.name, "Created agent");
        Ok(agent)
    }
}

#[async_trait]
impl BudgetLedger for InMemoryStore {
    async fn settle(&self, agent_id: &str, cost_usd: f64) -> Result<f64> {
        let mut agent = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| Error::Ledger(LedgerError::UnknownAgent(agent_id.to_string())))?;

        agent.budget_used_usd += cost_usd;
        Ok(agent.budget_used_usd)
    }
}

#[async_trait]
impl AuditSink for InMemoryStore {
    async fn record(&self, record: AuditRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap();

        if records.iter().any(|r| r.request_id == record.request_id) {
            return Err(Error::Store(StoreError::DuplicateRecord(
                record.request_id.clone(),
            )));
        }

        records.push(record);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}
