//! Usage

pub mod errors;
pub mod records;
pub mod repository;
pub mod service;

pub use errors::UsageServiceError;
pub use service::*;
