//! Record types - the typed nodes of the lexical graph
//!
//! Every entry of the corpus maps to one of three record kinds:
//! - `Word`: a headword, the usual dictionary entry
//! - `Definition`: one numbered gloss of a word
//! - `Pattern`: a reusable template ("modèle") that entries refer to by name

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Closed set of record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Headword entry
    Word,
    /// Numbered gloss attached to a word
    Definition,
    /// Named template shared between entries
    Pattern,
}

impl RecordKind {
    /// Get the string representation of the record kind
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Word => "word",
            RecordKind::Definition => "definition",
            RecordKind::Pattern => "pattern",
        }
    }

    /// Get all record kinds
    pub fn all() -> &'static [RecordKind] {
        &[RecordKind::Word, RecordKind::Definition, RecordKind::Pattern]
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "word" | "entry" | "headword" => Ok(RecordKind::Word),
            "definition" | "def" | "gloss" => Ok(RecordKind::Definition),
            "pattern" | "template" | "modele" | "modèle" => Ok(RecordKind::Pattern),
            _ => Err(Error::InvalidKind(format!("Unknown record kind: {}", s))),
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque identity handle of a persisted record.
///
/// Handles are only meaningful for the store that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A record in the lexical graph.
///
/// The title is unique and case-sensitive across all kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    /// Identity handle assigned by the store
    pub id: RecordId,
    /// Unique title
    pub title: String,
    /// Kind of record
    pub kind: RecordKind,
    /// Free text body (definition gloss, pattern source)
    pub content: Option<String>,
}

impl Record {
    /// Get a short description for display
    pub fn short_description(&self) -> String {
        format!("{} {}", self.kind, self.title)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Record {}

impl std::hash::Hash for Record {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_roundtrip() {
        for kind in RecordKind::all() {
            let parsed: RecordKind = kind.as_str().parse().unwrap();
            assert_eq!(*kind, parsed);
        }
    }

    #[test]
    fn test_record_kind_aliases() {
        assert_eq!(RecordKind::from_str("template").unwrap(), RecordKind::Pattern);
        assert_eq!(RecordKind::from_str("Gloss").unwrap(), RecordKind::Definition);
        assert_eq!(RecordKind::from_str("headword").unwrap(), RecordKind::Word);
        assert!(RecordKind::from_str("verb").is_err());
    }

    #[test]
    fn test_record_identity_is_handle() {
        let a = Record { id: RecordId(1), title: "chat".into(), kind: RecordKind::Word, content: None };
        let b = Record { id: RecordId(1), title: "chat".into(), kind: RecordKind::Word, content: Some("x".into()) };
        let c = Record { id: RecordId(2), title: "chat".into(), kind: RecordKind::Word, content: None };

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.short_description(), "word chat");
    }
}
