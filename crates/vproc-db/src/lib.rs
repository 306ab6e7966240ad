//! Relational job state store.
//!
//! This crate provides:
//! - The `JobStore` trait: point lookup, null-coalescing upsert, atomic claim, delete
//! - A SQLite implementation on `sqlx`

pub mod config;
pub mod error;
pub mod sqlite;
pub mod store;

pub use config::DbConfig;
pub use error::{DbError, DbResult};
pub use sqlite::SqliteJobStore;
pub use store::JobStore;
