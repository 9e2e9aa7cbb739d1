//! Shared helpers for database-backed integration tests

pub mod database_helper;

pub use database_helper::TestDatabase;
