//! Upstream Config

use clap::Args;

/// Upstream API settings.
#[derive(Debug, Args)]
pub struct UpstreamConfig {
    /// Base URL requests are forwarded to
    #[arg(
        long = "upstream-base-url",
        env = "UPSTREAM_BASE_URL",
        default_value = "https://api.tavily.com"
    )]
    pub base_url: String,

    /// Upstream request timeout in seconds
    #[arg(
        long = "upstream-timeout-seconds",
        env = "UPSTREAM_TIMEOUT_SECONDS",
        default_value_t = 150
    )]
    pub timeout_seconds: u64,
}
