//! Update Distributed Key Handler

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use sublet_app::domain::tokens::{data::TokenUpdate, records::TokenUuid};

use crate::{
    errors::ApiError,
    extensions::*,
    timestamps,
    tokens::models::{TokenItem, TokenResponse},
};

/// Update Distributed Key Request
///
/// Only supplied fields change. `clear_expires_at` wins over `expires_at`.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct UpdateTokenRequest {
    pub name: Option<String>,
    pub note: Option<String>,
    pub is_active: Option<bool>,
    pub expires_at: Option<String>,

    #[serde(default)]
    pub clear_expires_at: bool,

    pub rate_limit_per_minute: Option<i32>,
}

impl TryFrom<UpdateTokenRequest> for TokenUpdate {
    type Error = ApiError;

    fn try_from(request: UpdateTokenRequest) -> Result<Self, Self::Error> {
        if request.name.is_none()
            && request.note.is_none()
            && request.is_active.is_none()
            && request.expires_at.is_none()
            && !request.clear_expires_at
            && request.rate_limit_per_minute.is_none()
        {
            return Err(ApiError::bad_request("missing_fields"));
        }

        let expires_at = timestamps::parse_opt(request.expires_at.as_deref())
            .map_err(|_error| ApiError::bad_request("invalid_expires_at"))?;

        Ok(TokenUpdate {
            name: request.name,
            note: request.note,
            is_active: request.is_active,
            expires_at,
            clear_expires_at: request.clear_expires_at,
            rate_limit_per_minute: request.rate_limit_per_minute,
        })
    }
}

/// Update Distributed Key Handler
#[endpoint(tags("distributed-keys"), summary = "Update a distributed key")]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<TokenResponse>, ApiError> {
    let uuid: TokenUuid = req.id_param_or_400("id")?;
    let request: UpdateTokenRequest = req.json_or_400().await?;

    let token = depot
        .state_or_500()?
        .app
        .tokens
        .update_token(uuid, request.try_into()?)
        .await?;

    Ok(Json(TokenResponse {
        item: TokenItem::from(&token),
    }))
}
