//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - records(id, title, kind, content)
//! - relations(source_id, kind, destination_id)
//! - pending_references(name, referencer_id)

pub mod canonical;
pub mod schema;
pub mod sqlite;

pub use sqlite::{SqliteStore, DbStats};
