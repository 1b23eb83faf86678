//! Cryptographic primitives for token storage.

mod cipher;
mod secrets;

pub use cipher::*;
pub use secrets::*;
