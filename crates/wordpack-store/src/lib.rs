//! wordpack-store - SQLite storage layer
//!
//! This crate provides persistent, transactional storage for word packs and
//! their words. Every multi-step mutation runs inside one SQLite write
//! transaction so concurrent callers can share a single store.

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

// Re-export schema for testing/migrations
pub use schema::{SCHEMA, SCHEMA_VERSION};
