//! Observability lifecycle.

use tracing::info;

use crate::config::ServerConfig;

use super::{ObservabilityError, logging, settings};

/// Runtime observability state.
#[derive(Debug)]
pub(crate) struct Observability;

impl Observability {
    /// Install the tracing subscriber and apply request-logging settings.
    pub(crate) fn init(config: &ServerConfig) -> Result<Self, ObservabilityError> {
        settings::apply_runtime_config(config);
        logging::init_subscriber(config)?;

        Ok(Self)
    }

    /// Log the shutdown; buffered writers flush on drop.
    pub(crate) fn shutdown(self) {
        info!("observability shut down");
    }
}
