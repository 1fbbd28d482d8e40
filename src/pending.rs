//! Pending Reference Index - names referenced before their entry exists
//!
//! A persistent multi-map from a reference name to the set of records that
//! mentioned it. Entries only hold record ids; deleting a record purges its
//! entries instead of being blocked by them.
//!
//! The free functions take `&Connection` and are meant to be called under
//! the store lock, usually inside the resolver's transactions.
//! [`PendingIndex`] is the read-only view handed out to callers.

use rusqlite::{Connection, params};
use serde::Serialize;
use crate::record::RecordId;
use crate::storage::SqliteStore;
use crate::Result;

/// One forward reference awaiting resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEntry {
    /// Name that was referenced
    pub name: String,
    /// Record that referenced it
    pub referencer: RecordId,
    /// Title of the referencer, for display
    pub referencer_title: String,
}

/// Add `(name, referencer)`. Returns false if the pair was already pending.
pub fn append(conn: &Connection, name: &str, referencer: RecordId) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO pending_references (name, referencer_id) VALUES (?1, ?2)",
        params![name, referencer.0],
    )?;
    Ok(inserted > 0)
}

/// All entries keyed by `name`, oldest first
pub fn entries(conn: &Connection, name: &str) -> Result<Vec<PendingEntry>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT p.name, p.referencer_id, r.title
        FROM pending_references p
        JOIN records r ON r.id = p.referencer_id
        WHERE p.name = ?1
        ORDER BY p.id
        "#,
    )?;

    let entries = stmt
        .query_map([name], row_to_entry)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entries)
}

/// Remove every entry keyed by `name`
pub fn remove_all(conn: &Connection, name: &str) -> Result<usize> {
    let removed = conn.execute("DELETE FROM pending_references WHERE name = ?1", [name])?;
    Ok(removed)
}

/// Remove every entry whose referencer is `referencer`
pub fn purge_referencer(conn: &Connection, referencer: RecordId) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM pending_references WHERE referencer_id = ?1",
        [referencer.0],
    )?;
    Ok(removed)
}

/// Distinct pending names with their referencer counts
pub fn names(conn: &Connection) -> Result<Vec<(String, usize)>> {
    let mut stmt = conn.prepare(
        "SELECT name, COUNT(*) FROM pending_references GROUP BY name ORDER BY name",
    )?;

    let names = stmt
        .query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok((row.get(0)?, count as usize))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(names)
}

/// Count all pending entries
pub fn count(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM pending_references", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Count distinct pending names
pub fn count_names(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT name) FROM pending_references",
        [],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<PendingEntry> {
    Ok(PendingEntry {
        name: row.get(0)?,
        referencer: RecordId(row.get(1)?),
        referencer_title: row.get(2)?,
    })
}

/// Read view over the pending index of one store.
///
/// Constructed per ingestion run and handed around explicitly; mutation
/// goes through [`crate::DeferredResolver`].
#[derive(Clone)]
pub struct PendingIndex {
    store: SqliteStore,
}

impl PendingIndex {
    pub fn new(store: &SqliteStore) -> Self {
        Self { store: store.clone() }
    }

    /// Entries waiting on `name`
    pub fn entries_for(&self, name: &str) -> Result<Vec<PendingEntry>> {
        self.store.with_connection(|conn| entries(conn, name))
    }

    /// Whether `referencer` is waiting on `name`
    pub fn contains(&self, name: &str, referencer: RecordId) -> Result<bool> {
        Ok(self.entries_for(name)?.iter().any(|e| e.referencer == referencer))
    }

    /// Every pending name with its referencer count
    pub fn names(&self) -> Result<Vec<(String, usize)>> {
        self.store.with_connection(names)
    }

    pub fn len(&self) -> Result<usize> {
        self.store.with_connection(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;

    #[test]
    fn test_append_is_a_set() {
        let store = SqliteStore::open_in_memory().unwrap();
        let chien = store.obtain_or_create("chien", RecordKind::Word).unwrap();

        store.with_connection(|conn| {
            assert!(append(conn, "PatternA", chien.id)?);
            assert!(!append(conn, "PatternA", chien.id)?);
            Ok(())
        }).unwrap();

        let index = PendingIndex::new(&store);
        assert_eq!(index.len().unwrap(), 1);
        assert!(index.contains("PatternA", chien.id).unwrap());
    }

    #[test]
    fn test_names_groups_referencers() {
        let store = SqliteStore::open_in_memory().unwrap();
        let chien = store.obtain_or_create("chien", RecordKind::Word).unwrap();
        let chat = store.obtain_or_create("chat", RecordKind::Word).unwrap();

        store.with_connection(|conn| {
            append(conn, "PatternA", chien.id)?;
            append(conn, "PatternA", chat.id)?;
            append(conn, "PatternB", chat.id)?;
            Ok(())
        }).unwrap();

        let index = PendingIndex::new(&store);
        assert_eq!(
            index.names().unwrap(),
            vec![("PatternA".to_string(), 2), ("PatternB".to_string(), 1)]
        );

        let entries = index.entries_for("PatternA").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].referencer_title, "chien");
        assert_eq!(entries[1].referencer_title, "chat");
    }

    #[test]
    fn test_purge_referencer_keeps_others() {
        let store = SqliteStore::open_in_memory().unwrap();
        let chien = store.obtain_or_create("chien", RecordKind::Word).unwrap();
        let chat = store.obtain_or_create("chat", RecordKind::Word).unwrap();

        let purged = store.with_connection(|conn| {
            append(conn, "PatternA", chien.id)?;
            append(conn, "PatternB", chien.id)?;
            append(conn, "PatternA", chat.id)?;
            purge_referencer(conn, chien.id)
        }).unwrap();

        assert_eq!(purged, 2);
        let index = PendingIndex::new(&store);
        assert_eq!(index.len().unwrap(), 1);
        assert!(index.contains("PatternA", chat.id).unwrap());
        assert!(!index.contains("PatternA", chien.id).unwrap());
    }
}
