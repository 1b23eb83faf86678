//! Bulk Provisioning

pub mod errors;
pub mod job;
pub mod service;

pub use errors::BulkJobError;
pub use service::*;
