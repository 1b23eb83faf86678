//! Admin Secret

pub mod errors;
pub mod repository;
pub mod service;

pub use errors::AdminSecretError;
pub use service::*;
