//! Pool key errors.

use thiserror::Error;

use crate::database::StoreError;

#[derive(Debug, Error)]
pub enum PoolKeysServiceError {
    #[error("key already exists")]
    AlreadyExists,

    #[error("key is empty")]
    MissingKey,

    #[error("storage error")]
    Storage(#[source] StoreError),
}

impl From<StoreError> for PoolKeysServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::AlreadyExists => Self::AlreadyExists,
            other => Self::Storage(other),
        }
    }
}
