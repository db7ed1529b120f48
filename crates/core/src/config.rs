use config::{Config, ConfigError, Environment, File};
use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub upstream: UpstreamConfig,
    pub governance: GovernanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Use the built-in mock provider instead of a real upstream.
    pub use_mock: bool,
    pub base_url: String,
    pub api_key: Option<Secret<String>>,
    /// Ceiling on a single upstream call, seconds.
    pub timeout_secs: u64,
    /// Flat settlement rate applied to total tokens.
    pub unit_cost_per_token: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GovernanceConfig {
    /// Bearer secret for the admin API. Generated at startup when unset.
    pub admin_token: Option<Secret<String>>,
    pub json_logs: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("VIBEGATE_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map VIBEGATE__SERVER__PORT=8000 to server.port
            .add_source(Environment::with_prefix("VIBEGATE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".into(),
                port: 8000,
                enable_cors: true,
            },
            store: StoreConfig {
                db_path: "vibegate.db".into(),
            },
            upstream: UpstreamConfig {
                use_mock: true,
                base_url: "https://api.openai.com/v1".into(),
                api_key: None,
                timeout_secs: 60,
                unit_cost_per_token: 0.000002,
            },
            governance: GovernanceConfig {
                admin_token: None,
                json_logs: false,
            },
        }
    }
}
