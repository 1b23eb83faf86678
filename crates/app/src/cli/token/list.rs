use clap::Args;
use sublet_app::domain::tokens::TokensService;

use super::{RegistryArgs, or_placeholder};

#[derive(Debug, Args)]
pub(crate) struct ListTokensArgs {
    #[command(flatten)]
    registry: RegistryArgs,

    /// Print one JSON object per token instead of blocks
    #[arg(long)]
    json: bool,
}

pub(crate) async fn run(args: ListTokensArgs) -> Result<(), String> {
    let tokens = args
        .registry
        .registry()
        .await?
        .list_tokens()
        .await
        .map_err(|error| format!("failed to list tokens: {error}"))?;

    if args.json {
        for token in tokens {
            let line = serde_json::json!({
                "id": token.uuid,
                "name": token.name,
                "key_prefix": token.key_prefix,
                "is_active": token.is_active,
                "rate_limit_per_minute": token.rate_limit_per_minute,
                "created_at": token.created_at.to_string(),
                "last_used_at": token.last_used_at.map(|when| when.to_string()),
                "expires_at": token.expires_at.map(|when| when.to_string()),
            });

            println!("{line}");
        }

        return Ok(());
    }

    if tokens.is_empty() {
        println!("no tokens found");
        return Ok(());
    }

    for token in tokens {
        println!("token_uuid: {}", token.uuid);
        println!("name: {}", token.name);
        println!("key_prefix: {}", token.key_prefix);
        println!("is_active: {}", token.is_active);
        println!("rate_limit_per_minute: {}", token.rate_limit_per_minute);
        println!("created_at: {}", token.created_at);
        println!("last_used_at: {}", or_placeholder(token.last_used_at, "never"));
        println!("expires_at: {}", or_placeholder(token.expires_at, "none"));
        println!();
    }

    Ok(())
}
