//! Corpus ingestion - JSONL entries into records, relations and references

pub mod driver;
pub mod entry;

pub use driver::{EntryFailure, IngestDriver, IngestOptions, IngestStats};
pub use entry::{read_entries, CorpusEntry};
