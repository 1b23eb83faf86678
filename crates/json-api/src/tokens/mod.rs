//! Distributed key administration.

mod errors;
mod handlers;
mod models;

pub(crate) use handlers::*;
