//! SQLite-backed store for agents and audit records.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::Arc;

use vibegate_core::{
    error::{AuthError, LedgerError, StoreError},
    traits::{AgentRegistry, AuditSink, BudgetLedger, IdentityStore},
    types::{Agent, AuditRecord, NewAgent},
    Error, Result,
};

/// SQLite store behind a single async mutex.
///
/// All statements run on the blocking pool. Settlement is a single SQL
/// increment, so the read-modify-write happens inside the storage engine,
/// never in application memory.
pub struct SqliteStore {
    conn: Arc<tokio::sync::Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(store_unavailable)?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_unavailable)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn).map_err(store_unavailable)?;
        Ok(Self {
            conn: Arc::new(tokio::sync::Mutex::new(conn)),
        })
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS agents (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            token TEXT UNIQUE NOT NULL,
            rate_limit_per_minute INTEGER NOT NULL,
            budget_total_usd REAL NOT NULL,
            budget_used_usd REAL NOT NULL DEFAULT 0.0,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_agents_token ON agents (token)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_records (
            request_id TEXT PRIMARY KEY,
            agent_id TEXT NOT NULL,
            endpoint TEXT NOT NULL,
            model TEXT,
            sanitized_input TEXT,
            status TEXT NOT NULL,
            risk_flags TEXT NOT NULL,
            tokens_used INTEGER,
            latency_ms REAL,
            cost_usd REAL,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_records (timestamp)",
        [],
    )?;

    Ok(())
}

fn store_unavailable(e: rusqlite::Error) -> Error {
    Error::Store(StoreError::Unavailable(e.to_string()))
}

fn row_to_agent(row: &Row<'_>) -> rusqlite::Result<Agent> {
    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        token: row.get(2)?,
        rate_limit_per_minute: row.get(3)?,
        budget_total_usd: row.get(4)?,
        budget_used_usd: row.get(5)?,
        active: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<AuditRecord> {
    let status: String = row.get(5)?;
    let status = status.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, e.into())
    })?;
    let flags_json: String = row.get(6)?;

    Ok(AuditRecord {
        request_id: row.get(0)?,
        agent_id: row.get(1)?,
        endpoint: row.get(2)?,
        model: row.get(3)?,
        sanitized_input: row.get(4)?,
        status,
        risk_flags: serde_json::from_str(&flags_json).unwrap_or_default(),
        tokens_used: row.get(7)?,
        latency_ms: row.get(8)?,
        cost_usd: row.get(9)?,
        timestamp: row.get(10)?,
    })
}

#[async_trait]
impl IdentityStore for SqliteStore {
    async fn resolve(&self, token: &str) -> Result<Agent> {
        let conn = self.conn.clone();
        let token = token.to_string();

        let agent = tokio::task::spawn_blocking(move || -> Result<Option<Agent>> {
            let conn = conn.blocking_lock();
            conn.query_row(
                "SELECT id, name, token, rate_limit_per_minute, budget_total_usd,
                        budget_used_usd, active, created_at
                 FROM agents WHERE token = ?1",
                params![token],
                row_to_agent,
            )
            .optional()
            .map_err(store_unavailable)
        })
        .await
        .map_err(|e| Error::internal(e.to_string()))??;

        let agent = agent.ok_or(AuthError::InvalidToken)?;
        agent.ensure_admissible()?;
        Ok(agent)
    }
}

#[async_trait]
impl AgentRegistry for SqliteStore {
    async fn create_agent(&self, params: NewAgent) -> Result<Agent> {
        let agent = Agent::issue(&params);
        let conn = self.conn.clone();
        let row = agent.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO agents (id, name, token, rate_limit_per_minute,
                                     budget_total_usd, budget_used_usd, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.id,
                    row.name,
                    row.token,
                    row.rate_limit_per_minute,
                    row.budget_total_usd,
                    row.budget_used_usd,
                    row.active,
                    row.created_at
                ],
            )
            .map_err(store_unavailable)?;
            Ok(())
        })
        .await
        .map_err(|e| Error::internal(e.to_string()))??;

        tracing::info!(agent_id = %agent.id, name = %agent.name, "Created agent");
        Ok(agent)
    }
}

#[async_trait]
impl BudgetLedger for SqliteStore {
    async fn settle(&self, agent_id: &str, cost_usd: f64) -> Result<f64> {
        let conn = self.conn.clone();
        let agent_id = agent_id.to_string();

        tokio::task::spawn_blocking(move || -> Result<f64> {
            let conn = conn.blocking_lock();
            let updated = conn
                .execute(
                    "UPDATE agents SET budget_used_usd = budget_used_usd + ?1 WHERE id = ?2",
                    params![cost_usd, agent_id],
                )
                .map_err(|e| Error::Ledger(LedgerError::StoreUnavailable(e.to_string())))?;

            if updated == 0 {
                return Err(Error::Ledger(LedgerError::UnknownAgent(agent_id)));
            }

            conn.query_row(
                "SELECT budget_used_usd FROM agents WHERE id = ?1",
                params![agent_id],
                |row| row.get(0),
            )
            .map_err(|e| Error::Ledger(LedgerError::StoreUnavailable(e.to_string())))
        })
        .await
        .map_err(|e| Error::internal(e.to_string()))?
    }
}

#[async_trait]
impl AuditSink for SqliteStore {
    async fn record(&self, record: AuditRecord) -> Result<()> {
        let flags_json = serde_json::to_string(&record.risk_flags)?;
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO audit_records (request_id, agent_id, endpoint, model,
                                            sanitized_input, status, risk_flags,
                                            tokens_used, latency_ms, cost_usd, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.request_id,
                    record.agent_id,
                    record.endpoint,
                    record.model,
                    record.sanitized_input,
                    record.status.as_str(),
                    flags_json,
                    record.tokens_used,
                    record.latency_ms,
                    record.cost_usd,
                    record.timestamp
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(f, _)
                    if f.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Error::Store(StoreError::DuplicateRecord(record.request_id.clone()))
                }
                other => store_unavailable(other),
            })?;
            Ok(())
        })
        .await
        .map_err(|e| Error::internal(e.to_string()))?
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<AuditRecord>> {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(
                    "SELECT request_id, agent_id, endpoint, model, sanitized_input,
                            status, risk_flags, tokens_used, latency_ms, cost_usd, timestamp
                     FROM audit_records
                     ORDER BY timestamp DESC, rowid DESC
                     LIMIT ?1",
                )
                .map_err(store_unavailable)?;

            let records = stmt
                .query_map(params![limit as i64], row_to_record)
                .map_err(store_unavailable)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(store_unavailable)?;

            Ok(records)
        })
        .await
        .map_err(|e| Error::internal(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibegate_core::types::AuditStatus;

    fn params(name: &str) -> NewAgent {
        NewAgent {
            name: name.into(),
            budget_limit_usd: 10.0,
            rate_limit_per_minute: 60,
        }
    }

    #[tokio::test]
    async fn test_create_and_resolve() {
        let store = SqliteStore::open_in_memory().unwrap();
        let agent = store.create_agent(params("worker")).await.unwrap();

        let resolved = store.resolve(&agent.token).await.unwrap();
        assert_eq!(resolved.id, agent.id);
        assert_eq!(resolved.rate_limit_per_minute, 60);
        assert_eq!(resolved.budget_used_usd, 0.0);
    }

    #[tokio::test]
    async fn test_resolve_unknown_token() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.resolve("vg-nope").await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_resolve_suspended_agent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let agent = store.create_agent(params("worker")).await.unwrap();

        {
            let conn = store.conn.lock().await;
            conn.execute(
                "UPDATE agents SET active = 0 WHERE id = ?1",
                params![agent.id],
            )
            .unwrap();
        }

        let err = store.resolve(&agent.token).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::AgentSuspended)));
    }

    #[tokio::test]
    async fn test_resolve_exhausted_budget() {
        let store = SqliteStore::open_in_memory().unwrap();
        let agent = store.create_agent(params("worker")).await.unwrap();

        store.settle(&agent.id, 10.0).await.unwrap();

        let err = store.resolve(&agent.token).await.unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::BudgetExhausted)));
    }

    #[tokio::test]
    async fn test_settle_accumulates() {
        let store = SqliteStore::open_in_memory().unwrap();
        let agent = store.create_agent(params("worker")).await.unwrap();

        assert_eq!(store.settle(&agent.id, 0.10).await.unwrap(), 0.10);
        let total = store.settle(&agent.id, 0.20).await.unwrap();
        assert!((total - 0.30).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_settle_unknown_agent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.settle("missing", 0.10).await.unwrap_err();
        assert!(matches!(err, Error::Ledger(LedgerError::UnknownAgent(_))));
    }

    #[tokio::test]
    async fn test_audit_append_and_recent() {
        let store = SqliteStore::open_in_memory().unwrap();

        for i in 0..3 {
            let record = AuditRecord::new(
                format!("req-{i}"),
                "agent-1",
                "/v1/chat/completions",
                AuditStatus::Success,
            )
            .with_usage(30, 0.00006)
            .with_latency_ms(12.5);
            store.record(record).await.unwrap();
        }

        let recent = store.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].request_id, "req-2");
        assert_eq!(recent[1].request_id, "req-1");
        assert_eq!(recent[0].tokens_used, Some(30));
    }

    #[tokio::test]
    async fn test_duplicate_audit_record_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();

        let record = AuditRecord::new("req-1", "agent-1", "/v1/chat/completions", AuditStatus::Blocked)
            .with_risk_flags(vec!["PROMPT_INJECTION".into()]);
        store.record(record.clone()).await.unwrap();

        let err = store.record(record).await.unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::DuplicateRecord(_))));

        // The original record is untouched.
        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].risk_flags, vec!["PROMPT_INJECTION"]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.db");

        let token = {
            let store = SqliteStore::open(&path).unwrap();
            store.create_agent(params("worker")).await.unwrap().token
        };

        let store = SqliteStore::open(&path).unwrap();
        let agent = store.resolve(&token).await.unwrap();
        assert_eq!(agent.name, "worker");
    }
}
