//! Rotate Distributed Key Handler

use salvo::prelude::*;
use sublet_app::domain::tokens::records::TokenUuid;
use tracing::info;

use crate::{errors::ApiError, extensions::*, tokens::models::IssuedTokenResponse};

/// Rotate Distributed Key Handler
///
/// Issues a new secret for the key, clears its last use and re-enables it.
/// The previous secret stops authenticating immediately.
#[endpoint(tags("distributed-keys"), summary = "Rotate a distributed key")]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<IssuedTokenResponse>, ApiError> {
    let uuid: TokenUuid = req.id_param_or_400("id")?;

    let issued = depot.state_or_500()?.app.tokens.rotate_token(uuid).await?;

    info!(token = %uuid, "distributed key rotated over the admin api");

    Ok(Json(IssuedTokenResponse::from(&issued)))
}
