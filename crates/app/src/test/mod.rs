//! Shared test infrastructure.

mod db;

pub use db::TestDb;
