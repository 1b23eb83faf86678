//! Admin secret errors.

use thiserror::Error;

use crate::database::StoreError;

#[derive(Debug, Error)]
pub enum AdminSecretError {
    #[error("storage error")]
    Storage(#[from] StoreError),
}
