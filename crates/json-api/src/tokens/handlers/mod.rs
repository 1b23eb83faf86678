//! Distributed Key Handlers

pub(crate) mod create;
pub(crate) mod delete;
pub(crate) mod index;
pub(crate) mod rotate;
pub(crate) mod stats;
pub(crate) mod update;
