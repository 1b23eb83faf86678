//! Distributed access tokens for a shared upstream API.

pub mod context;
pub mod crypto;
pub mod database;
pub mod domain;
pub mod gateway;
pub mod rate_limiter;
pub mod upstream;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

#[cfg(test)]
mod test;

mod uuids;

pub use uuids::TypedUuid;
