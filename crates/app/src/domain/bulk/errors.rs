//! Bulk provisioning errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BulkJobError {
    #[error("no keys to create")]
    NoItems,

    #[error("too many keys in one batch: {count} exceeds {limit}")]
    TooLarge { count: usize, limit: usize },
}
