//! Server configuration module

use std::time::Duration;

use clap::Parser;
use sublet_app::context::AppConfig;

use crate::config::{
    admin::AdminConfig, db::DatabaseConfig, logging::LoggingConfig, server::ServerRuntimeConfig,
    tokens::TokensConfig, upstream::UpstreamConfig,
};

pub(crate) mod admin;
pub(crate) mod db;
pub(crate) mod logging;
pub(crate) mod server;
pub(crate) mod tokens;
pub(crate) mod upstream;

pub(crate) use logging::LogFormat;

/// Sublet JSON API Server configuration
#[derive(Debug, Parser)]
#[command(name = "sublet-json", about = "Sublet JSON API Server", long_about = None)]
pub struct ServerConfig {
    /// Server network settings.
    #[command(flatten)]
    pub server: ServerRuntimeConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Application database settings.
    #[command(flatten)]
    pub database: DatabaseConfig,

    /// Distributed token settings.
    #[command(flatten)]
    pub tokens: TokensConfig,

    /// Admin secret settings.
    #[command(flatten)]
    pub admin: AdminConfig,

    /// Upstream API settings.
    #[command(flatten)]
    pub upstream: UpstreamConfig,
}

impl ServerConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Get the socket address for binding
    #[must_use]
    pub fn socket_addr(&self) -> String {
        self.server.socket_addr()
    }

    /// Settings consumed by the application context.
    #[must_use]
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database.database_url.clone(),
            encryption_key: self.tokens.encryption_key.clone(),
            default_rate_limit: self.tokens.rate_limit_default,
            rate_limit_window: Duration::from_secs(self.tokens.rate_limit_window_seconds),
            master_key: self
                .admin
                .master_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            upstream_base_url: self.upstream.base_url.clone(),
            upstream_timeout: Duration::from_secs(self.upstream.timeout_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    const REQUIRED: [&str; 5] = [
        "sublet-json",
        "--database-url",
        "postgres://localhost/sublet",
        "--encryption-key",
        "0123456789abcdef",
    ];

    #[test]
    fn defaults_match_documented_values() -> TestResult {
        let config = ServerConfig::try_parse_from(REQUIRED)?;

        assert_eq!(config.socket_addr(), "0.0.0.0:8698");
        assert_eq!(config.tokens.rate_limit_default, 60);
        assert_eq!(config.tokens.rate_limit_window_seconds, 60);
        assert_eq!(config.upstream.timeout_seconds, 150);
        assert_eq!(config.logging.slow_request_threshold_ms, 1_000);

        Ok(())
    }

    #[test]
    fn blank_master_key_is_treated_as_absent() -> TestResult {
        let mut args = REQUIRED.to_vec();

        args.extend(["--master-key", "   "]);

        let config = ServerConfig::try_parse_from(args)?;

        assert!(config.app_config().master_key.is_none());

        Ok(())
    }

    #[test]
    fn missing_encryption_key_is_an_error() {
        let result = ServerConfig::try_parse_from([
            "sublet-json",
            "--database-url",
            "postgres://localhost/sublet",
        ]);

        assert!(result.is_err());
    }
}
