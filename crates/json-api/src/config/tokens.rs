//! Distributed Token Config

use clap::Args;

/// Distributed token settings.
#[derive(Debug, Args)]
pub struct TokensConfig {
    /// AES key sealing token secrets: 16, 24 or 32 raw bytes, or their base64
    #[arg(long, env = "USER_KEY_ENCRYPTION_KEY", hide_env_values = true)]
    pub encryption_key: String,

    /// Requests per window for tokens created without a limit; negative clamps to 0
    #[arg(
        long,
        env = "USER_KEY_RATE_LIMIT_DEFAULT",
        default_value_t = 60,
        allow_negative_numbers = true
    )]
    pub rate_limit_default: i32,

    /// Rate limit window length in seconds; 0 falls back to 60
    #[arg(long, env = "USER_KEY_RATE_LIMIT_WINDOW_SECONDS", default_value_t = 60)]
    pub rate_limit_window_seconds: u64,
}
