//! Request parsing helpers that fail with stable error codes.

use std::str::FromStr;

use salvo::prelude::Request;
use serde::de::DeserializeOwned;

use crate::errors::ApiError;

pub(crate) trait RequestExt {
    /// Deserialize the body as JSON regardless of the declared content type.
    async fn json_or_400<T: DeserializeOwned>(&mut self) -> Result<T, ApiError>;

    /// Parse a path parameter, rejecting it as `invalid_id`.
    fn id_param_or_400<T: FromStr>(&self, name: &str) -> Result<T, ApiError>;
}

impl RequestExt for Request {
    async fn json_or_400<T: DeserializeOwned>(&mut self) -> Result<T, ApiError> {
        let Ok(payload) = self.payload().await else {
            return Err(ApiError::bad_request("invalid_json"));
        };

        serde_json::from_slice(payload).map_err(|_error| ApiError::bad_request("invalid_json"))
    }

    fn id_param_or_400<T: FromStr>(&self, name: &str) -> Result<T, ApiError> {
        self.param::<String>(name)
            .and_then(|raw| raw.trim().parse().ok())
            .ok_or(ApiError::bad_request("invalid_id"))
    }
}
