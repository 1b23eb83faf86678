use clap::{Args, Subcommand};

mod reset;

#[derive(Debug, Args)]
pub(crate) struct AdminSecretCommand {
    #[command(subcommand)]
    command: AdminSecretSubcommand,
}

#[derive(Debug, Subcommand)]
enum AdminSecretSubcommand {
    /// Replace the admin secret with a freshly generated one
    Reset(reset::ResetArgs),
}

pub(crate) async fn run(command: AdminSecretCommand) -> Result<(), String> {
    match command.command {
        AdminSecretSubcommand::Reset(args) => reset::run(args).await,
    }
}
