//! Pool Keys

pub mod errors;
pub mod records;
pub mod repository;
pub mod service;

pub use errors::PoolKeysServiceError;
pub use service::*;
