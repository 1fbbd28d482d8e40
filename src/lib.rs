//! # Lexigraph - single-pass dictionary graph ingestion
//!
//! Builds a persistent graph of typed records from a stream of
//! cross-referencing entries (e.g. a dictionary dump).
//!
//! Lexigraph provides:
//! - A SQLite-backed record store with title-unique obtain-or-create
//! - A closed relation catalog validated at apply time
//! - A pending reference index for names seen before their entry
//! - A deferred resolver that links pending referencers atomically
//! - A sequential and a sharded JSONL ingestion driver

pub mod record;
pub mod relation;
pub mod storage;
pub mod pending;
pub mod resolver;
pub mod ingest;
pub mod output;
pub mod config;
pub mod ui;


// Re-exports for convenient access
pub use record::{Record, RecordId, RecordKind};
pub use relation::{Relation, RelationKind};
pub use storage::SqliteStore;
pub use pending::{PendingEntry, PendingIndex};
pub use resolver::{DeferredResolver, LinkOutcome, TransferOutcome};

/// Result type alias for Lexigraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Lexigraph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Record '{title}' already exists as {existing}, cannot obtain it as {requested}")]
    TypeConflict {
        title: String,
        existing: RecordKind,
        requested: RecordKind,
    },

    #[error("Relation {kind} expects a {expected} destination, got {actual}")]
    TypeMismatch {
        kind: RelationKind,
        expected: RecordKind,
        actual: RecordKind,
    },

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid kind: {0}")]
    InvalidKind(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ingestion worker failed: {0}")]
    Worker(String),
}

impl Error {
    /// Errors that only invalidate the entry being ingested.
    ///
    /// Everything else (store and I/O failures) aborts the run.
    pub fn is_entry_scoped(&self) -> bool {
        matches!(
            self,
            Error::TypeConflict { .. }
                | Error::TypeMismatch { .. }
                | Error::Parse(_)
                | Error::InvalidKind(_)
                | Error::Json(_)
        )
    }
}
