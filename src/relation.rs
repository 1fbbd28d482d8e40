//! Relation catalog - the closed set of typed edges
//!
//! Each relation kind declares the record kind allowed as its destination:
//! - `Definition`: word → definition
//! - `Synonym`: word → word
//! - `Antonym`: word → word
//! - `Pattern`: any record → pattern
//!
//! The check is made when a relation is applied, because at reference time
//! the destination may not exist yet.

use crate::record::{Record, RecordId, RecordKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Closed enumeration of relation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Word has this gloss
    Definition,
    /// Word means the same as another word
    Synonym,
    /// Word means the opposite of another word
    Antonym,
    /// Record uses a named pattern
    Pattern,
}

impl RelationKind {
    /// Get the string representation of the relation kind
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Definition => "definition",
            RelationKind::Synonym => "synonym",
            RelationKind::Antonym => "antonym",
            RelationKind::Pattern => "pattern",
        }
    }

    /// Get all relation kinds
    pub fn all() -> &'static [RelationKind] {
        &[
            RelationKind::Definition,
            RelationKind::Synonym,
            RelationKind::Antonym,
            RelationKind::Pattern,
        ]
    }

    /// Record kind a destination of this relation must have
    pub fn destination_kind(&self) -> RecordKind {
        match self {
            RelationKind::Definition => RecordKind::Definition,
            RelationKind::Synonym | RelationKind::Antonym => RecordKind::Word,
            RelationKind::Pattern => RecordKind::Pattern,
        }
    }

    /// Fails with `TypeMismatch` unless `destination` may be targeted by this kind
    pub fn validate(&self, destination: RecordKind) -> Result<()> {
        let expected = self.destination_kind();
        if destination != expected {
            return Err(Error::TypeMismatch {
                kind: *self,
                expected,
                actual: destination,
            });
        }
        Ok(())
    }
}

impl FromStr for RelationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "definition" | "def" | "defines" => Ok(RelationKind::Definition),
            "synonym" | "syn" => Ok(RelationKind::Synonym),
            "antonym" | "ant" => Ok(RelationKind::Antonym),
            "pattern" | "template" | "uses" => Ok(RelationKind::Pattern),
            _ => Err(Error::InvalidKind(format!("Unknown relation kind: {}", s))),
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed, typed edge between two records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    /// Source record
    pub source: RecordId,
    /// Type of relationship
    pub kind: RelationKind,
    /// Destination record
    pub destination: RecordId,
}

impl Relation {
    /// Build a relation after checking the destination against the catalog
    pub fn checked(source: &Record, kind: RelationKind, destination: &Record) -> Result<Self> {
        kind.validate(destination.kind)?;
        Ok(Self {
            source: source.id,
            kind,
            destination: destination.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, title: &str, kind: RecordKind) -> Record {
        Record { id: RecordId(id), title: title.to_string(), kind, content: None }
    }

    #[test]
    fn test_relation_kind_roundtrip() {
        for kind in RelationKind::all() {
            let parsed: RelationKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_destination_table() {
        assert_eq!(RelationKind::Definition.destination_kind(), RecordKind::Definition);
        assert_eq!(RelationKind::Synonym.destination_kind(), RecordKind::Word);
        assert_eq!(RelationKind::Antonym.destination_kind(), RecordKind::Word);
        assert_eq!(RelationKind::Pattern.destination_kind(), RecordKind::Pattern);
    }

    #[test]
    fn test_checked_accepts_matching_destination() {
        let chien = record(1, "chien", RecordKind::Word);
        let pattern = record(2, "PatternA", RecordKind::Pattern);

        let relation = Relation::checked(&chien, RelationKind::Pattern, &pattern).unwrap();
        assert_eq!(relation.source, chien.id);
        assert_eq!(relation.destination, pattern.id);
    }

    #[test]
    fn test_checked_rejects_wrong_destination() {
        let chien = record(1, "chien", RecordKind::Word);
        let chat = record(2, "chat", RecordKind::Word);

        let err = Relation::checked(&chien, RelationKind::Definition, &chat).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                kind: RelationKind::Definition,
                expected: RecordKind::Definition,
                actual: RecordKind::Word,
            }
        ));
    }
}
