//! SQLite storage implementation

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior, params};
use serde::Serialize;
use crate::{Result, Error};
use crate::pending;
use crate::record::{Record, RecordId, RecordKind};
use crate::relation::{Relation, RelationKind};
use super::{canonical, schema};

/// Default time a writer waits on a locked database file
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed storage for the lexical graph.
///
/// Cloning is cheap and yields a handle on the same connection. Every
/// operation holds the connection lock for its whole duration, so each
/// multi-statement operation is linearizable against the others.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    /// Open a database file with a custom busy timeout
    pub fn open_with_timeout(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Journal mode: {}", mode);
        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.initialize_schema()?;
        tracing::debug!("Opened store at {}", path.display());
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Arc::new(Mutex::new(conn)) };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Run `f` against the connection without a transaction
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run `f` inside an immediate transaction.
    ///
    /// Commits when `f` returns `Ok`; any error drops the transaction, which
    /// rolls every statement of `f` back.
    pub fn with_transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // ========== Record Operations ==========

    /// Return the record titled `title`, creating it as `kind` if absent.
    ///
    /// Fails with `TypeConflict` if the title is taken by another kind.
    pub fn obtain_or_create(&self, title: &str, kind: RecordKind) -> Result<Record> {
        self.with_transaction(|tx| canonical::bind(tx, title, kind))
    }

    /// Find a record by title
    pub fn find(&self, title: &str) -> Result<Option<Record>> {
        self.with_connection(|conn| canonical::lookup(conn, title))
    }

    /// Get a record by identity handle
    pub fn get(&self, id: RecordId) -> Result<Option<Record>> {
        self.with_connection(|conn| canonical::lookup_id(conn, id))
    }

    /// Replace the content of a record
    pub fn set_content(&self, record: &Record, content: Option<&str>) -> Result<Record> {
        self.with_transaction(|tx| update_content(tx, record.id, content))
    }

    /// Find records by kind, ordered by title
    pub fn records_by_kind(&self, kind: RecordKind) -> Result<Vec<Record>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, kind, content FROM records WHERE kind = ?1 ORDER BY title",
            )?;
            let records = stmt
                .query_map([kind.as_str()], canonical::row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(records)
        })
    }

    /// Count all records
    pub fn count_records(&self) -> Result<usize> {
        self.with_connection(count_records)
    }

    /// Delete a record with its incident relations and pending entries.
    ///
    /// Returns false when the record was already gone.
    pub fn delete(&self, record: &Record) -> Result<bool> {
        self.with_transaction(|tx| delete_record(tx, record.id))
    }

    // ========== Relation Operations ==========

    /// Apply a relation after validating it against the catalog.
    ///
    /// Both ends are re-read so a stale handle cannot link a deleted record.
    pub fn apply_relation(&self, source: &Record, kind: RelationKind, destination: &Record) -> Result<Relation> {
        self.with_transaction(|tx| {
            let source = canonical::require(tx, source.id)?;
            let destination = canonical::require(tx, destination.id)?;
            let relation = Relation::checked(&source, kind, &destination)?;
            insert_relation(tx, &relation)?;
            Ok(relation)
        })
    }

    /// Get relations leaving a record
    pub fn relations_from(&self, source: RecordId) -> Result<Vec<Relation>> {
        self.query_relations("WHERE source_id = ?1", params![source.0])
    }

    /// Get relations arriving at a record (reverse lookup)
    pub fn relations_to(&self, destination: RecordId) -> Result<Vec<Relation>> {
        self.query_relations("WHERE destination_id = ?1", params![destination.0])
    }

    /// Get relations by kind
    pub fn relations_by_kind(&self, kind: RelationKind) -> Result<Vec<Relation>> {
        self.query_relations("WHERE kind = ?1", params![kind.as_str()])
    }

    /// Remove every relation of `kind` leaving `source`
    pub fn clear_relations(&self, source: &Record, kind: RelationKind) -> Result<usize> {
        self.with_transaction(|tx| {
            let removed = remove_relations(tx, source.id, kind)?;
            tracing::debug!("Cleared {} {} relations from '{}'", removed, kind, source.title);
            Ok(removed)
        })
    }

    /// Count all relations
    pub fn count_relations(&self) -> Result<usize> {
        self.with_connection(count_relations)
    }

    fn query_relations(&self, filter: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Relation>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT source_id, kind, destination_id FROM relations {filter} ORDER BY id"
            ))?;
            let relations = stmt
                .query_map(params, row_to_relation)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(relations)
        })
    }

    // ========== Bulk Operations ==========

    /// Delete all data (for re-ingestion)
    pub fn clear_all(&self) -> Result<()> {
        self.with_transaction(|tx| {
            tx.execute("DELETE FROM pending_references", [])?;
            tx.execute("DELETE FROM relations", [])?;
            tx.execute("DELETE FROM records", [])?;
            Ok(())
        })
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        self.with_connection(|conn| {
            let by_kind = |kind: RecordKind| -> Result<usize> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM records WHERE kind = ?1",
                    [kind.as_str()],
                    |row| row.get(0),
                )?;
                Ok(count as usize)
            };

            Ok(DbStats {
                records: count_records(conn)?,
                words: by_kind(RecordKind::Word)?,
                definitions: by_kind(RecordKind::Definition)?,
                patterns: by_kind(RecordKind::Pattern)?,
                relations: count_relations(conn)?,
                pending: pending::count(conn)?,
                pending_names: pending::count_names(conn)?,
            })
        })
    }
}

/// Insert a relation unless the same triple exists. Returns true if inserted.
///
/// Callers validate the relation first; this only writes.
pub fn insert_relation(conn: &Connection, relation: &Relation) -> Result<bool> {
    let inserted = conn.execute(
        r#"
        INSERT OR IGNORE INTO relations (source_id, kind, destination_id)
        VALUES (?1, ?2, ?3)
        "#,
        params![relation.source.0, relation.kind.as_str(), relation.destination.0],
    )?;
    Ok(inserted > 0)
}

/// Destinations of the `kind` relations leaving `source`, oldest first
pub fn relation_destinations(conn: &Connection, source: RecordId, kind: RelationKind) -> Result<Vec<RecordId>> {
    let mut stmt = conn.prepare(
        "SELECT destination_id FROM relations WHERE source_id = ?1 AND kind = ?2 ORDER BY id",
    )?;
    let ids = stmt
        .query_map(params![source.0, kind.as_str()], |row| Ok(RecordId(row.get(0)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

/// Delete the `kind` relations leaving `source`
pub fn remove_relations(conn: &Connection, source: RecordId, kind: RelationKind) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM relations WHERE source_id = ?1 AND kind = ?2",
        params![source.0, kind.as_str()],
    )?;
    Ok(removed)
}

/// Set the content of record `id` and return the updated record
pub fn update_content(conn: &Connection, id: RecordId, content: Option<&str>) -> Result<Record> {
    let updated = conn.execute(
        "UPDATE records SET content = ?1 WHERE id = ?2",
        params![content, id.0],
    )?;
    if updated == 0 {
        return Err(Error::RecordNotFound(id.to_string()));
    }
    canonical::require(conn, id)
}

/// Remove a record, its incident relations and its pending entries
pub fn delete_record(conn: &Connection, id: RecordId) -> Result<bool> {
    let relations = conn.execute(
        "DELETE FROM relations WHERE source_id = ?1 OR destination_id = ?1",
        [id.0],
    )?;
    let purged = pending::purge_referencer(conn, id)?;
    let removed = canonical::unbind(conn, id)?;

    if removed {
        tracing::debug!("Deleted record {} ({} relations, {} pending entries)", id, relations, purged);
    }
    Ok(removed)
}

fn count_records(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
    Ok(count as usize)
}

fn count_relations(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM relations", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Helper to convert a row to a Relation
fn row_to_relation(row: &rusqlite::Row) -> rusqlite::Result<Relation> {
    let kind_str: String = row.get(1)?;
    let kind: RelationKind = kind_str.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Relation {
        source: RecordId(row.get(0)?),
        kind,
        destination: RecordId(row.get(2)?),
    })
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub records: usize,
    pub words: usize,
    pub definitions: usize,
    pub patterns: usize,
    pub relations: usize,
    pub pending: usize,
    pub pending_names: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Records: {} (words: {}, definitions: {}, patterns: {})",
            self.records, self.words, self.definitions, self.patterns)?;
        writeln!(f, "  Relations: {}", self.relations)?;
        writeln!(f, "  Pending: {} entries for {} names", self.pending, self.pending_names)
    }
}
