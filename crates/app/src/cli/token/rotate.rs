use clap::Args;
use sublet_app::domain::tokens::{TokensService, records::TokenUuid};

use super::RegistryArgs;

#[derive(Debug, Args)]
pub(crate) struct RotateTokenArgs {
    #[command(flatten)]
    registry: RegistryArgs,

    /// Token to issue a new secret for
    #[arg(long)]
    token_uuid: TokenUuid,
}

pub(crate) async fn run(args: RotateTokenArgs) -> Result<(), String> {
    let issued = args
        .registry
        .registry()
        .await?
        .rotate_token(args.token_uuid)
        .await
        .map_err(|error| format!("failed to rotate token: {error}"))?;

    println!("token_uuid: {}", issued.token.uuid);
    println!("plain_key: {}", issued.plain.expose());
    println!("the previous key no longer authenticates");

    Ok(())
}
