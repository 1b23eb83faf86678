use std::sync::Arc;

use clap::{Args, Subcommand};
use sublet_app::{crypto::TokenCipher, domain::tokens::TokenRegistry};

use crate::cli::DatabaseArgs;

mod create;
mod delete;
mod list;
mod rotate;

#[derive(Debug, Args)]
pub(crate) struct TokenCommand {
    #[command(subcommand)]
    command: TokenSubcommand,
}

#[derive(Debug, Subcommand)]
enum TokenSubcommand {
    Create(create::CreateTokenArgs),
    List(list::ListTokensArgs),
    Rotate(rotate::RotateTokenArgs),
    Delete(delete::DeleteTokenArgs),
}

pub(crate) async fn run(command: TokenCommand) -> Result<(), String> {
    match command.command {
        TokenSubcommand::Create(args) => create::run(args).await,
        TokenSubcommand::List(args) => list::run(args).await,
        TokenSubcommand::Rotate(args) => rotate::run(args).await,
        TokenSubcommand::Delete(args) => delete::run(args).await,
    }
}

/// Connection and key material shared by every token command.
#[derive(Debug, Args)]
pub(crate) struct RegistryArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    /// AES key for token secrets (raw 16/24/32 bytes or base64)
    #[arg(long, env = "USER_KEY_ENCRYPTION_KEY", hide_env_values = true)]
    encryption_key: String,

    /// Requests per window given to tokens created without a limit
    #[arg(long, env = "USER_KEY_RATE_LIMIT_DEFAULT", default_value_t = 60)]
    default_rate_limit: i32,
}

impl RegistryArgs {
    pub(crate) async fn registry(&self) -> Result<TokenRegistry, String> {
        let cipher = TokenCipher::new(&self.encryption_key)
            .map_err(|error| format!("invalid encryption key: {error}"))?;

        let pool = self.database.connect().await?;

        Ok(TokenRegistry::postgres(
            pool,
            Arc::new(cipher),
            self.default_rate_limit,
        ))
    }
}

fn or_placeholder<T: ToString>(value: Option<T>, placeholder: &str) -> String {
    value.map_or_else(|| placeholder.to_owned(), |value| value.to_string())
}
