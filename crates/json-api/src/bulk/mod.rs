//! Bulk pool key provisioning.

mod errors;
mod handlers;
mod models;

pub(crate) use handlers::*;
