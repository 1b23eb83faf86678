use clap::Args;
use jiff::Timestamp;
use sublet_app::domain::tokens::{TokensService, data::NewToken};

use super::RegistryArgs;

#[derive(Debug, Args)]
pub(crate) struct CreateTokenArgs {
    #[command(flatten)]
    registry: RegistryArgs,

    /// Display name
    #[arg(long, default_value = "")]
    name: String,

    /// Operator note
    #[arg(long, default_value = "")]
    note: String,

    /// Optional expiration timestamp (RFC 3339)
    #[arg(long)]
    expires_at: Option<String>,

    /// Requests per window; 0 is unlimited
    #[arg(long)]
    rate_limit_per_minute: Option<i32>,
}

pub(crate) async fn run(args: CreateTokenArgs) -> Result<(), String> {
    let expires_at = parse_expires_at(args.expires_at.as_deref())?;

    let registry = args.registry.registry().await?;

    let issued = registry
        .create_token(NewToken {
            name: args.name,
            note: args.note,
            expires_at,
            rate_limit_per_minute: args.rate_limit_per_minute,
        })
        .await
        .map_err(|error| format!("failed to create token: {error}"))?;

    println!("token_uuid: {}", issued.token.uuid);
    println!("name: {}", issued.token.name);
    println!("rate_limit_per_minute: {}", issued.token.rate_limit_per_minute);
    if let Some(expires_at) = issued.token.expires_at {
        println!("expires_at: {expires_at}");
    }
    println!("plain_key: {}", issued.plain.expose());
    println!("store this key now; it can be recovered only through the admin API");

    Ok(())
}

fn parse_expires_at(raw: Option<&str>) -> Result<Option<Timestamp>, String> {
    raw.map(|value| {
        value
            .parse::<Timestamp>()
            .map_err(|error| format!("invalid expires-at timestamp: {error}"))
    })
    .transpose()
}
