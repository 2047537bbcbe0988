//! API configuration

use serde::Deserialize;
use std::time::Duration;

use domain_cases::LifecycleSettings;
use infra_db::DatabaseConfig;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// API configuration
///
/// Every field can be set through an `API_`-prefixed environment variable,
/// e.g. `API_PORT=9000` or `API_DB_TIMEOUT_SECS=2`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    pub log_format: LogFormat,
    pub db_max_connections: u32,
    /// Pool acquire timeout and per-statement timeout
    pub db_timeout_secs: u64,
    /// Days between a finance entry's issue date and its due date
    pub invoice_due_days: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/case_desk".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            db_max_connections: 10,
            db_timeout_secs: 5,
            invoice_due_days: 30,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pool settings derived from the `db_*` fields
    pub fn database(&self) -> DatabaseConfig {
        let timeout = Duration::from_secs(self.db_timeout_secs);
        DatabaseConfig::new(self.database_url.clone())
            .max_connections(self.db_max_connections)
            .acquire_timeout(timeout)
            .statement_timeout(timeout)
    }

    pub fn lifecycle(&self) -> LifecycleSettings {
        LifecycleSettings {
            invoice_due_days: self.invoice_due_days,
        }
    }
}
