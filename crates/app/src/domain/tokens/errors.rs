//! Token registry errors.

use thiserror::Error;

use crate::{crypto::CipherError, database::StoreError};

#[derive(Debug, Error)]
pub enum TokensServiceError {
    /// Unknown id, or a secret that does not authenticate.
    #[error("token not found")]
    NotFound,

    #[error("token is disabled")]
    Disabled,

    #[error("token has expired")]
    Expired,

    #[error("rate limit must not be negative")]
    InvalidRateLimit,

    #[error("failed to generate a unique token secret")]
    GenerationExhausted,

    #[error("token cipher error")]
    Cipher(#[from] CipherError),

    #[error("storage error")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for TokensServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}
