//! Deferred Reference Resolver
//!
//! Entries can mention a name before the entry defining it has been read.
//! Instead of a second pass, the resolver parks `(name, referencer)` in the
//! pending index and, once the defining record appears, links every parked
//! referencer to it in a single transaction.
//!
//! Per name the lifecycle is `UNSEEN → PENDING → RESOLVED → PENDING …`:
//! a reference registered after a transfer waits for the next transfer of
//! that name, which may never come.

use rusqlite::Connection;
use serde::Serialize;
use crate::pending::{self, PendingIndex};
use crate::record::{Record, RecordId};
use crate::relation::{Relation, RelationKind};
use crate::storage::{canonical, sqlite, SqliteStore};
use crate::{Error, Result};

/// Result of a [`DeferredResolver::transfer_all`] call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub name: String,
    pub destination: RecordId,
    pub kind: RelationKind,
    /// Referencers linked and removed from the pending index
    pub linked: usize,
}

impl TransferOutcome {
    pub fn is_noop(&self) -> bool {
        self.linked == 0
    }
}

/// Result of a [`DeferredResolver::link_or_register`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "destination")]
pub enum LinkOutcome {
    /// The name already had a record; the relation was applied directly
    Linked(RecordId),
    /// The name is unknown; the referencer now waits in the pending index
    Pending,
}

/// Coordinates forward references for one store.
///
/// Built explicitly for an ingestion run and passed by reference; cloning
/// shares the same store handle.
#[derive(Clone)]
pub struct DeferredResolver {
    store: SqliteStore,
    pending: PendingIndex,
}

impl DeferredResolver {
    pub fn new(store: &SqliteStore) -> Self {
        Self {
            store: store.clone(),
            pending: PendingIndex::new(store),
        }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn pending(&self) -> &PendingIndex {
        &self.pending
    }

    /// Record that `referencer` mentions `name`.
    ///
    /// Never creates a relation, even if a record titled `name` already
    /// exists. Returns false if the pair was already pending.
    pub fn register(&self, name: &str, referencer: &Record) -> Result<bool> {
        let added = self.store.with_transaction(|tx| {
            canonical::require(tx, referencer.id)?;
            pending::append(tx, name, referencer.id)
        })?;

        tracing::debug!("Registered '{}' as pending reference from '{}'", name, referencer.title);
        Ok(added)
    }

    /// Link every referencer pending on `name` to `destination` with `kind`,
    /// then clear them from the index.
    ///
    /// All or nothing: on `TypeMismatch` or a store failure no relation from
    /// this call survives and every pending entry is kept.
    pub fn transfer_all(&self, name: &str, destination: &Record, kind: RelationKind) -> Result<TransferOutcome> {
        let result = self.store.with_transaction(|tx| transfer(tx, name, destination, kind));

        match &result {
            Ok(outcome) if !outcome.is_noop() => {
                tracing::debug!("Transferred {} references to '{}' as {}", outcome.linked, name, kind);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Transfer of '{}' to {} rolled back: {}", name, destination.short_description(), e);
            }
        }
        result
    }

    /// Link `referencer` to the record titled `name` if it exists, otherwise
    /// register the reference as pending.
    ///
    /// Lookup and write share one transaction, so a concurrent
    /// `transfer_all` for `name` either sees the new entry or the record
    /// already existed; the referencer is never stranded.
    pub fn link_or_register(&self, name: &str, referencer: &Record, kind: RelationKind) -> Result<LinkOutcome> {
        self.store.with_transaction(|tx| link_or_append(tx, name, referencer, kind))
    }

    /// Delete a record together with its relations and pending entries
    pub fn delete(&self, record: &Record) -> Result<bool> {
        self.store.with_transaction(|tx| sqlite::delete_record(tx, record.id))
    }

    /// Transfer `name` to the record that carries it as title.
    ///
    /// Used to retry names left pending after a failed transfer.
    pub fn resolve_by_title(&self, name: &str, kind: RelationKind) -> Result<TransferOutcome> {
        let destination = self
            .store
            .find(name)?
            .ok_or_else(|| Error::RecordNotFound(name.to_string()))?;
        self.transfer_all(name, &destination, kind)
    }
}

/// Link every referencer pending on `name` to `destination`, then clear
/// them. Runs on the caller's connection; the caller owns the transaction.
pub fn transfer(conn: &Connection, name: &str, destination: &Record, kind: RelationKind) -> Result<TransferOutcome> {
    let destination = canonical::require(conn, destination.id)?;
    let entries = pending::entries(conn, name)?;

    for entry in &entries {
        kind.validate(destination.kind)?;
        let relation = Relation {
            source: entry.referencer,
            kind,
            destination: destination.id,
        };
        sqlite::insert_relation(conn, &relation)?;
    }

    let removed = pending::remove_all(conn, name)?;
    debug_assert_eq!(removed, entries.len());

    Ok(TransferOutcome {
        name: name.to_string(),
        destination: destination.id,
        kind,
        linked: entries.len(),
    })
}

/// Apply `kind` from `referencer` to the record titled `name`, or append a
/// pending entry when there is none yet
pub fn link_or_append(conn: &Connection, name: &str, referencer: &Record, kind: RelationKind) -> Result<LinkOutcome> {
    let referencer = canonical::require(conn, referencer.id)?;

    match canonical::lookup(conn, name)? {
        Some(destination) => {
            let relation = Relation::checked(&referencer, kind, &destination)?;
            sqlite::insert_relation(conn, &relation)?;
            Ok(LinkOutcome::Linked(destination.id))
        }
        None => {
            pending::append(conn, name, referencer.id)?;
            Ok(LinkOutcome::Pending)
        }
    }
}
