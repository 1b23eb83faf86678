//! Delete Distributed Key Handler

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use sublet_app::domain::tokens::records::TokenUuid;
use tracing::info;

use crate::{errors::ApiError, extensions::*};

/// Delete Distributed Key Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct DeletedResponse {
    pub ok: bool,
}

/// Delete Distributed Key Handler
///
/// Deleting an unknown key succeeds.
#[endpoint(tags("distributed-keys"), summary = "Delete a distributed key")]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<DeletedResponse>, ApiError> {
    let uuid: TokenUuid = req.id_param_or_400("id")?;

    depot.state_or_500()?.app.tokens.delete_token(uuid).await?;

    info!(token = %uuid, "distributed key deleted over the admin api");

    Ok(Json(DeletedResponse { ok: true }))
}
