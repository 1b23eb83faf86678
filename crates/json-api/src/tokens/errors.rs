//! Errors

use sublet_app::domain::tokens::TokensServiceError;
use tracing::error;

use crate::errors::ApiError;

impl From<TokensServiceError> for ApiError {
    fn from(error: TokensServiceError) -> Self {
        match error {
            TokensServiceError::NotFound => ApiError::not_found(),
            TokensServiceError::InvalidRateLimit => {
                ApiError::bad_request("invalid_rate_limit_per_minute")
            }
            TokensServiceError::Disabled => ApiError::unauthorized("key_disabled"),
            TokensServiceError::Expired => ApiError::unauthorized("key_expired"),
            TokensServiceError::GenerationExhausted => {
                error!("distributed key secret generation exhausted its retries");

                ApiError::internal()
            }
            TokensServiceError::Cipher(source) => {
                error!("distributed key cipher failure: {source}");

                ApiError::internal()
            }
            TokensServiceError::Storage(source) => {
                error!("distributed key storage failure: {source}");

                ApiError::internal()
            }
        }
    }
}
