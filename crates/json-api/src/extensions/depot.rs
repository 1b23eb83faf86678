//! Depot helper extensions.

use std::sync::Arc;

use salvo::prelude::Depot;
use tracing::error;

use crate::{errors::ApiError, state::State};

/// Shared state lookups that fail as a logged internal error.
pub(crate) trait DepotExt {
    fn state_or_500(&self) -> Result<Arc<State>, ApiError>;
}

impl DepotExt for Depot {
    fn state_or_500(&self) -> Result<Arc<State>, ApiError> {
        self.obtain::<Arc<State>>().cloned().map_err(|_missing| {
            error!("application state was not injected");

            ApiError::internal()
        })
    }
}
