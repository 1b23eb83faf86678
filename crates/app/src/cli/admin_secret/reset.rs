use clap::Args;
use sublet_app::domain::admin_secret::{AdminSecretManager, AdminSecretService};

use crate::cli::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct ResetArgs {
    #[command(flatten)]
    database: DatabaseArgs,
}

pub(crate) async fn run(args: ResetArgs) -> Result<(), String> {
    let manager = AdminSecretManager::postgres(args.database.connect().await?);

    let secret = manager
        .reset()
        .await
        .map_err(|error| format!("failed to reset admin secret: {error}"))?;

    println!("admin_secret: {}", secret.expose());
    println!("running servers keep the previous secret until restarted");

    Ok(())
}
