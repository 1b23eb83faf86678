//! Bulk Handlers

pub(crate) mod start;
pub(crate) mod status;
