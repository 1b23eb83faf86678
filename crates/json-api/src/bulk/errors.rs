//! Errors

use sublet_app::domain::bulk::BulkJobError;

use crate::errors::ApiError;

impl From<BulkJobError> for ApiError {
    fn from(error: BulkJobError) -> Self {
        match error {
            BulkJobError::NoItems => ApiError::bad_request("missing_keys"),
            BulkJobError::TooLarge { .. } => ApiError::bad_request("too_many_keys"),
        }
    }
}
