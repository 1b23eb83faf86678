//! Admin Config

use clap::Args;

/// Admin secret settings.
#[derive(Debug, Args)]
pub struct AdminConfig {
    /// Preferred admin secret, used only when none is stored yet
    #[arg(long, env = "MASTER_KEY", hide_env_values = true)]
    pub master_key: Option<String>,
}
