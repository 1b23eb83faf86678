//! Sublet Domain Concerns

pub mod admin_secret;
pub mod bulk;
pub mod pool_keys;
pub mod tokens;
pub mod usage;
