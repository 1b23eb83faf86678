//! Authentication
//!
//! Distributed keys and the admin secret are separate credential spaces: the
//! admin guard never consults the token registry and the gateway guard never
//! consults the admin secret.

mod bearer;
pub(crate) mod middleware;

pub(crate) use bearer::extract_bearer_token;
