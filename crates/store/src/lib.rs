#![deny(unused)]
//! Durable state for vibegate.
//!
//! Two collections back the gateway: agents (keyed by identifier, indexed
//! by token) and audit records (keyed by request identifier, ordered by
//! timestamp). The SQLite store is the production backend; the in-memory
//! store backs tests and ephemeral deployments.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
