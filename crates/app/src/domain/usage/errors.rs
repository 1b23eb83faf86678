//! Usage meter errors.

use thiserror::Error;

use crate::database::StoreError;

#[derive(Debug, Error)]
pub enum UsageServiceError {
    #[error("storage error")]
    Storage(#[from] StoreError),
}
