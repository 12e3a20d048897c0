//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite schema and connection pool
//! - Feed, relationship and messaging queries

mod database;
mod models;

pub use database::Database;
pub use models::*;
