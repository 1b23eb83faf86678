//! Admin Secret Reset Handler

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{errors::ApiError, extensions::*};

/// Admin Secret Reset Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct MasterKeyResponse {
    /// The new admin secret; the previous one stops working immediately
    pub master_key: String,
}

/// Admin Secret Reset Handler
#[endpoint(tags("admin"), summary = "Replace the admin secret")]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<MasterKeyResponse>, ApiError> {
    let secret = depot
        .state_or_500()?
        .app
        .admin_secret
        .reset()
        .await
        .or_500("failed to reset the admin secret")?;

    info!("admin secret reset over the admin api");

    Ok(Json(MasterKeyResponse {
        master_key: secret.expose().to_owned(),
    }))
}
