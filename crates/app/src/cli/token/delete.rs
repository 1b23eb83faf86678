use clap::Args;
use sublet_app::domain::tokens::{TokensService, records::TokenUuid};

use super::RegistryArgs;

#[derive(Debug, Args)]
pub(crate) struct DeleteTokenArgs {
    #[command(flatten)]
    registry: RegistryArgs,

    /// Token to delete along with its usage history
    #[arg(long)]
    token_uuid: TokenUuid,
}

pub(crate) async fn run(args: DeleteTokenArgs) -> Result<(), String> {
    args.registry
        .registry()
        .await?
        .delete_token(args.token_uuid)
        .await
        .map_err(|error| format!("failed to delete token: {error}"))?;

    println!("deleted token {}", args.token_uuid);

    Ok(())
}
