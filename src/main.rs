#![deny(unused)]
//! vibegate - Admission & Policy Gateway
//!
//! Sits in front of a downstream text-generation provider. Every inbound
//! request passes identity verification, rate limiting, budget enforcement,
//! content screening, and PII redaction before being forwarded, and every
//! screened outcome is durably recorded for audit.

use rand::{distributions::Alphanumeric, Rng};
use secrecy::Secret;
use std::sync::Arc;

use vibegate_admin::AdminState;
use vibegate_core::config::AppConfig;
use vibegate_core::traits::UpstreamClient;
use vibegate_gateway::{AdmissionPipeline, GatewayConfig, GatewayServer};
use vibegate_governance::{ContentScreen, FixedWindowLimiter};
use vibegate_store::SqliteStore;
use vibegate_upstream::{CostModel, MockUpstream, OpenAiCompatClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({e}); falling back to defaults");
        AppConfig::default()
    });

    vibegate_governance::configure_tracing(config.governance.json_logs)?;

    tracing::info!("Starting vibegate v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Durable store: agents and audit records
    // =========================================================================
    let store = Arc::new(SqliteStore::open(&config.store.db_path)?);
    tracing::info!(db_path = %config.store.db_path, "SQLite store ready");

    // =========================================================================
    // Upstream provider
    // =========================================================================
    let upstream: Arc<dyn UpstreamClient> =
        if config.upstream.use_mock || config.upstream.api_key.is_none() {
            tracing::info!("Using mock upstream provider (no API key configured or mock enabled)");
            Arc::new(MockUpstream::new())
        } else {
            tracing::info!(base_url = %config.upstream.base_url, "Using OpenAI-compatible upstream");
            Arc::new(OpenAiCompatClient::new(&config.upstream)?)
        };

    // =========================================================================
    // Admission pipeline
    // =========================================================================
    let pipeline = AdmissionPipeline::new(
        store.clone(),
        Arc::new(FixedWindowLimiter::new()),
        ContentScreen::new(),
        upstream,
        store.clone(),
        store.clone(),
        CostModel::new(config.upstream.unit_cost_per_token),
    );

    // Admin secret: generated per process when not configured and logged
    // once so operators can manage agents.
    let admin_token = match config.governance.admin_token.clone() {
        Some(token) => token,
        None => {
            let generated: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(24)
                .map(char::from)
                .collect();
            tracing::warn!(
                "No admin token configured; using a generated one for this run: {}",
                generated
            );
            Secret::new(generated)
        }
    };

    let admin = Arc::new(AdminState {
        registry: store.clone(),
        audit: store,
        admin_token,
    });

    // =========================================================================
    // Observability & server
    // =========================================================================
    let metrics_handle = vibegate_governance::setup_metrics_recorder()?;

    let gateway_config = GatewayConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        enable_cors: config.server.enable_cors,
        enable_tracing: true,
    };

    tracing::info!(
        host = %gateway_config.host,
        port = gateway_config.port,
        "Gateway initialized"
    );

    GatewayServer::new(gateway_config, pipeline)
        .with_admin(admin)
        .with_metrics(metrics_handle)
        .run()
        .await?;

    Ok(())
}
