//! Create Distributed Key Handler

use salvo::{oapi::ToSchema, prelude::*};
use serde::{Deserialize, Serialize};
use sublet_app::domain::tokens::data::NewToken;
use tracing::info;

use crate::{
    errors::ApiError, extensions::*, timestamps, tokens::models::IssuedTokenResponse,
};

/// Create Distributed Key Request
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub(crate) struct CreateTokenRequest {
    /// Display name; blank falls back to the default name
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub note: String,

    /// RFC 3339 instant; blank or absent means the key never expires
    #[serde(default)]
    pub expires_at: Option<String>,

    /// Requests per minute; absent uses the server default, 0 means unlimited
    #[serde(default)]
    pub rate_limit_per_minute: Option<i32>,
}

impl TryFrom<CreateTokenRequest> for NewToken {
    type Error = ApiError;

    fn try_from(request: CreateTokenRequest) -> Result<Self, Self::Error> {
        let expires_at = timestamps::parse_opt(request.expires_at.as_deref())
            .map_err(|_error| ApiError::bad_request("invalid_expires_at"))?;

        Ok(NewToken {
            name: request.name,
            note: request.note,
            expires_at,
            rate_limit_per_minute: request.rate_limit_per_minute,
        })
    }
}

/// Create Distributed Key Handler
///
/// The plaintext key is returned once and cannot be recovered later.
#[endpoint(tags("distributed-keys"), summary = "Create a distributed key")]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
) -> Result<Json<IssuedTokenResponse>, ApiError> {
    let request: CreateTokenRequest = req.json_or_400().await?;

    let issued = depot
        .state_or_500()?
        .app
        .tokens
        .create_token(request.try_into()?)
        .await?;

    info!(token = %issued.token.uuid, "distributed key issued over the admin api");

    Ok(Json(IssuedTokenResponse::from(&issued)))
}

#[cfg(test)]
mod tests {
    use salvo::test::{ResponseExt, TestClient};
    use serde_json::json;
    use sublet_app::{
        crypto::PlainSecret,
        domain::{
            tokens::{MockTokensService, TokensServiceError, data::IssuedToken, records::TokenUuid},
            usage::MockUsageService,
        },
    };
    use testresult::TestResult;

    use crate::errors::ErrorBody;

    use super::{super::tests::*, *};

    fn route() -> Router {
        Router::with_path("distributed-keys").post(handler)
    }

    #[tokio::test]
    async fn test_create_returns_plain_key_and_item() -> TestResult {
        let token = make_token(TokenUuid::new());
        let uuid = token.uuid;

        let mut tokens = MockTokensService::new();

        tokens
            .expect_create_token()
            .once()
            .withf(|new| new.name == "Team A" && new.rate_limit_per_minute == Some(5))
            .return_once(move |_| {
                Ok(IssuedToken {
                    token,
                    plain: PlainSecret::new("uk_live_secret"),
                })
            });

        let mut res = TestClient::post("http://example.com/distributed-keys")
            .json(&json!({ "name": "Team A", "rate_limit_per_minute": 5 }))
            .send(&make_service(tokens, MockUsageService::new(), route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));

        let body: IssuedTokenResponse = res.take_json().await?;

        assert_eq!(body.plain_key, "uk_live_secret");
        assert_eq!(body.item.id, uuid.to_string());

        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_negative_rate_limit() -> TestResult {
        let mut tokens = MockTokensService::new();

        tokens
            .expect_create_token()
            .once()
            .return_once(|_| Err(TokensServiceError::InvalidRateLimit));

        let mut res = TestClient::post("http://example.com/distributed-keys")
            .json(&json!({ "rate_limit_per_minute": -1 }))
            .send(&make_service(tokens, MockUsageService::new(), route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        let body: ErrorBody = res.take_json().await?;

        assert_eq!(body.error, "invalid_rate_limit_per_minute");

        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_body() -> TestResult {
        let mut tokens = MockTokensService::new();

        tokens.expect_create_token().never();

        let mut res = TestClient::post("http://example.com/distributed-keys")
            .raw_json("{not json")
            .send(&make_service(tokens, MockUsageService::new(), route()))
            .await;

        assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

        let body: ErrorBody = res.take_json().await?;

        assert_eq!(body.error, "invalid_json");

        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_unparseable_expiry() -> TestResult {
        let mut tokens = MockTokensService::new();

        tokens.expect_create_token().never();

        let mut res = TestClient::post("http://example.com/distributed-keys")
            .json(&json!({ "expires_at": "next tuesday" }))
            .send(&make_service(tokens, MockUsageService::new(), route()))
            .await;

        let body: ErrorBody = res.take_json().await?;

        assert_eq!(body.error, "invalid_expires_at");

        Ok(())
    }
}
