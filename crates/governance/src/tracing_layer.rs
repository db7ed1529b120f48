//! Tracing configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vibegate_core::Result;

/// Configure stdout logging with an env-driven filter.
///
/// `RUST_LOG` overrides the default level; `json_logs` switches the
/// formatter to JSON lines for log shippers.
pub fn configure_tracing(json_logs: bool) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,vibegate=debug".into()),
    );

    let registry = tracing_subscriber::registry().with(env_filter);

    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    Ok(())
}
