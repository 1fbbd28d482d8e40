//! Canonical index - title → record identity
//!
//! Helpers here take a plain `&Connection` so they run unchanged inside a
//! transaction (`Transaction` derefs to `Connection`). They never lock the
//! store; callers hold the lock.

use rusqlite::{Connection, params, OptionalExtension};
use crate::record::{Record, RecordId, RecordKind};
use crate::{Error, Result};

const SELECT_RECORD: &str = "SELECT id, title, kind, content FROM records";

/// Look up a record by its exact (case-sensitive) title
pub fn lookup(conn: &Connection, title: &str) -> Result<Option<Record>> {
    conn.query_row(
        &format!("{SELECT_RECORD} WHERE title = ?1"),
        [title],
        row_to_record,
    )
    .optional()
    .map_err(Into::into)
}

/// Look up a record by identity handle
pub fn lookup_id(conn: &Connection, id: RecordId) -> Result<Option<Record>> {
    conn.query_row(
        &format!("{SELECT_RECORD} WHERE id = ?1"),
        [id.0],
        row_to_record,
    )
    .optional()
    .map_err(Into::into)
}

/// Resolve a handle to its live record, failing if it was deleted
pub fn require(conn: &Connection, id: RecordId) -> Result<Record> {
    lookup_id(conn, id)?.ok_or_else(|| Error::RecordNotFound(id.to_string()))
}

/// Bind `title` to a record of `kind`, creating it if the title is free.
///
/// `INSERT OR IGNORE` on the UNIQUE title makes this safe against other
/// connections racing on the same title; the row read back is the winner.
pub fn bind(conn: &Connection, title: &str, kind: RecordKind) -> Result<Record> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO records (title, kind) VALUES (?1, ?2)",
        params![title, kind.as_str()],
    )?;

    let record = lookup(conn, title)?
        .ok_or_else(|| Error::RecordNotFound(title.to_string()))?;

    if record.kind != kind {
        return Err(Error::TypeConflict {
            title: title.to_string(),
            existing: record.kind,
            requested: kind,
        });
    }

    if inserted > 0 {
        tracing::debug!("Created {} record '{}' ({})", kind, title, record.id);
    }
    Ok(record)
}

/// Remove the title binding. Returns false if the record was already gone.
pub fn unbind(conn: &Connection, id: RecordId) -> Result<bool> {
    let removed = conn.execute("DELETE FROM records WHERE id = ?1", [id.0])?;
    Ok(removed > 0)
}

/// Helper to convert a row to a Record
pub fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
    let kind_str: String = row.get(2)?;
    let kind: RecordKind = kind_str.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Record {
        id: RecordId(row.get(0)?),
        title: row.get(1)?,
        kind,
        content: row.get(3)?,
    })
}
