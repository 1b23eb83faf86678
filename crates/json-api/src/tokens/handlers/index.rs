//! List Distributed Keys Handler

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{errors::ApiError, extensions::*, tokens::models::TokenListItem};

/// Distributed Key List Response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub(crate) struct TokenListResponse {
    /// Keys, most recently created first
    pub items: Vec<TokenListItem>,
}

/// List Distributed Keys Handler
#[endpoint(tags("distributed-keys"), summary = "List distributed keys with usage totals")]
pub(crate) async fn handler(depot: &mut Depot) -> Result<Json<TokenListResponse>, ApiError> {
    let state = depot.state_or_500()?;

    let tokens = state.app.tokens.list_tokens().await?;

    let usage = state
        .app
        .usage
        .aggregate_by_token()
        .await
        .or_500("failed to aggregate distributed key usage")?;

    let items = tokens
        .iter()
        .map(|token| TokenListItem::new(token, usage.get(&token.uuid).copied().unwrap_or_default()))
        .collect();

    Ok(Json(TokenListResponse { items }))
}
