//! Ingestion driver - streams corpus entries into the graph
//!
//! For each entry the driver:
//! 1. obtains or creates the entry's record
//! 2. for a pattern entry, transfers every reference pending on its title
//! 3. links or registers each `{{pattern}}` reference of the text
//! 4. replaces the entry's definitions
//! 5. links synonyms and antonyms, creating their word records on demand
//!
//! All five steps run in one transaction. A failure scoped to one entry
//! (kind conflict, bad line, catalog mismatch) rolls the entry back and is
//! logged and counted; store failures abort the run.

use std::fmt;
use std::io::BufRead;
use crossbeam::channel::Sender;
use rusqlite::Connection;
use serde::Serialize;
use crate::ingest::entry::{read_entries, CorpusEntry};
use crate::pending;
use crate::record::{Record, RecordKind};
use crate::relation::{Relation, RelationKind};
use crate::resolver::{self, DeferredResolver, LinkOutcome};
use crate::storage::{canonical, sqlite};
use crate::ui::progress_message::{ProgressMessage, ProgressPhase};
use crate::{Error, Result};

/// Options controlling an ingestion run
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// Register every reference as pending, even when its record exists
    pub strict: bool,
    /// Number of worker threads for sharded ingestion
    pub shards: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { strict: false, shards: 1 }
    }
}

impl IngestOptions {
    /// Strict registration depends on corpus order, so it never shards.
    pub fn effective_shards(&self) -> usize {
        if self.strict { 1 } else { self.shards.max(1) }
    }
}

/// An entry that was skipped
#[derive(Debug, Clone, Serialize)]
pub struct EntryFailure {
    pub line: usize,
    pub title: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub entries: usize,
    pub skipped: usize,
    pub definitions: usize,
    pub word_relations: usize,
    /// References whose pattern already existed
    pub linked_directly: usize,
    /// References parked in the pending index
    pub registered: usize,
    /// Pattern entries that released pending references
    pub transfers: usize,
    /// Pending references released by those transfers
    pub transferred: usize,
    pub failures: Vec<EntryFailure>,
}

impl IngestStats {
    fn merge(&mut self, other: IngestStats) {
        self.entries += other.entries;
        self.skipped += other.skipped;
        self.definitions += other.definitions;
        self.word_relations += other.word_relations;
        self.linked_directly += other.linked_directly;
        self.registered += other.registered;
        self.transfers += other.transfers;
        self.transferred += other.transferred;
        self.failures.extend(other.failures);
    }

    fn skip(&mut self, line: usize, title: Option<&str>, error: &Error) {
        tracing::warn!("Skipping entry at line {} ({}): {}", line, title.unwrap_or("?"), error);
        self.skipped += 1;
        self.failures.push(EntryFailure {
            line,
            title: title.map(str::to_string),
            reason: error.to_string(),
        });
    }
}

impl fmt::Display for IngestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ingestion Stats:")?;
        writeln!(f, "  Entries: {}", self.entries)?;
        writeln!(f, "  📖 Definitions: {}", self.definitions)?;
        writeln!(f, "  🔗 Word relations: {}", self.word_relations)?;
        writeln!(f, "  ✅ Linked directly: {}", self.linked_directly)?;
        writeln!(f, "  ⏳ Registered pending: {}", self.registered)?;
        writeln!(f, "  🔁 Transferred: {} (in {} transfers)", self.transferred, self.transfers)?;
        writeln!(f, "  ⚠️  Skipped: {}", self.skipped)
    }
}

/// Drives corpus entries through the record store and the resolver.
pub struct IngestDriver {
    resolver: DeferredResolver,
    options: IngestOptions,
    progress: Option<Sender<ProgressMessage>>,
}

impl IngestDriver {
    pub fn new(resolver: DeferredResolver, options: IngestOptions) -> Self {
        Self { resolver, options, progress: None }
    }

    /// Report progress on `sender`
    pub fn with_progress(mut self, sender: Sender<ProgressMessage>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn resolver(&self) -> &DeferredResolver {
        &self.resolver
    }

    /// Ingest one entry.
    ///
    /// Every write of the entry shares one transaction: an entry that fails
    /// leaves nothing behind and adds nothing to `stats` but its skip.
    pub fn ingest_entry(&self, entry: &CorpusEntry, stats: &mut IngestStats) -> Result<Record> {
        let mut delta = IngestStats::default();
        let record = self
            .resolver
            .store()
            .with_transaction(|tx| self.write_entry(tx, entry, &mut delta))?;

        delta.entries += 1;
        stats.merge(delta);
        Ok(record)
    }

    fn write_entry(&self, conn: &Connection, entry: &CorpusEntry, stats: &mut IngestStats) -> Result<Record> {
        let mut record = canonical::bind(conn, &entry.title, entry.kind)?;

        if entry.kind == RecordKind::Pattern {
            if let Some(text) = &entry.text {
                record = sqlite::update_content(conn, record.id, Some(text.as_str()))?;
            }
            let outcome = resolver::transfer(conn, &entry.title, &record, RelationKind::Pattern)?;
            if !outcome.is_noop() {
                stats.transfers += 1;
                stats.transferred += outcome.linked;
            }
        }

        for name in entry.pattern_references() {
            if self.options.strict {
                pending::append(conn, &name, record.id)?;
                stats.registered += 1;
                continue;
            }
            match resolver::link_or_append(conn, &name, &record, RelationKind::Pattern)? {
                LinkOutcome::Linked(_) => stats.linked_directly += 1,
                LinkOutcome::Pending => stats.registered += 1,
            }
        }

        if !entry.definitions.is_empty() {
            replace_definitions(conn, &record, entry, stats)?;
        }

        let related = entry
            .synonyms
            .iter()
            .map(|w| (RelationKind::Synonym, w))
            .chain(entry.antonyms.iter().map(|w| (RelationKind::Antonym, w)));
        for (kind, title) in related {
            let other = canonical::bind(conn, title, RecordKind::Word)?;
            sqlite::insert_relation(conn, &Relation::checked(&record, kind, &other)?)?;
            stats.word_relations += 1;
        }

        Ok(record)
    }

    /// Ingest a JSONL stream, sharded when the options allow it
    pub fn ingest<R: BufRead>(&self, reader: R) -> Result<IngestStats> {
        if self.options.effective_shards() == 1 {
            return self.run(reader);
        }

        self.send(ProgressMessage::Started { phase: ProgressPhase::Reading, total: 0 });
        let mut unreadable = IngestStats::default();
        let mut entries = Vec::new();
        for (line, item) in read_entries(reader) {
            match item {
                Ok(entry) => entries.push((line, entry)),
                Err(e) if e.is_entry_scoped() => unreadable.skip(line, None, &e),
                Err(e) => return Err(e),
            }
        }
        self.send(ProgressMessage::Finished { phase: ProgressPhase::Reading });

        let mut stats = self.run_sharded(entries)?;
        stats.merge(unreadable);
        stats.failures.sort_by_key(|f| f.line);
        Ok(stats)
    }

    /// Ingest a JSONL stream in corpus order
    pub fn run<R: BufRead>(&self, reader: R) -> Result<IngestStats> {
        let mut stats = IngestStats::default();
        self.send(ProgressMessage::Started { phase: ProgressPhase::Ingesting, total: 0 });

        for (line, item) in read_entries(reader) {
            match item {
                Ok(entry) => self.ingest_one(line, &entry, &mut stats)?,
                Err(e) if e.is_entry_scoped() => stats.skip(line, None, &e),
                Err(e) => return Err(e),
            }
        }

        self.send(ProgressMessage::Finished { phase: ProgressPhase::Ingesting });
        tracing::info!("Ingested {} entries ({} skipped)", stats.entries, stats.skipped);
        Ok(stats)
    }

    /// Ingest already-read entries on `shards` threads sharing the store.
    ///
    /// Entries are dealt round-robin, so their relative order across
    /// shards is lost; `link_or_register` keeps the result order-independent.
    pub fn run_sharded(&self, entries: Vec<(usize, CorpusEntry)>) -> Result<IngestStats> {
        let shards = self.options.effective_shards();
        self.send(ProgressMessage::Started { phase: ProgressPhase::Ingesting, total: entries.len() });

        let mut buckets: Vec<Vec<(usize, CorpusEntry)>> = (0..shards).map(|_| Vec::new()).collect();
        for (i, item) in entries.into_iter().enumerate() {
            buckets[i % shards].push(item);
        }

        let results = crossbeam::thread::scope(|s| {
            let handles: Vec<_> = buckets
                .iter()
                .enumerate()
                .map(|(shard, bucket)| {
                    s.spawn(move |_| {
                        tracing::debug!("Shard {} ingesting {} entries", shard, bucket.len());
                        let mut stats = IngestStats::default();
                        for (line, entry) in bucket {
                            self.ingest_one(*line, entry, &mut stats)?;
                        }
                        Ok::<_, Error>(stats)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().map_err(|_| Error::Worker("shard thread panicked".to_string()))?)
                .collect::<Vec<Result<IngestStats>>>()
        })
        .map_err(|_| Error::Worker("shard scope panicked".to_string()))?;

        let mut stats = IngestStats::default();
        for result in results {
            stats.merge(result?);
        }
        stats.failures.sort_by_key(|f| f.line);

        self.send(ProgressMessage::Finished { phase: ProgressPhase::Ingesting });
        tracing::info!("Ingested {} entries on {} shards ({} skipped)", stats.entries, shards, stats.skipped);
        Ok(stats)
    }

    fn ingest_one(&self, line: usize, entry: &CorpusEntry, stats: &mut IngestStats) -> Result<()> {
        match self.ingest_entry(entry, stats) {
            Ok(_) => {
                self.send(ProgressMessage::Progress {
                    phase: ProgressPhase::Ingesting,
                    line,
                    title: Some(entry.title.clone()),
                });
                Ok(())
            }
            Err(e) if e.is_entry_scoped() => {
                self.send(ProgressMessage::Skipped(format!("{}: {}", entry.title, e)));
                stats.skip(line, Some(&entry.title), &e);
                Ok(())
            }
            Err(e) => {
                self.send(ProgressMessage::Error(e.to_string()));
                Err(e)
            }
        }
    }

    fn send(&self, message: ProgressMessage) {
        if let Some(tx) = &self.progress {
            // The receiver going away only stops the display
            let _ = tx.send(message);
        }
    }
}

/// Swap the definitions of `record` for the entry's glosses.
///
/// Definition records the new list no longer reaches are deleted.
fn replace_definitions(conn: &Connection, record: &Record, entry: &CorpusEntry, stats: &mut IngestStats) -> Result<()> {
    let previous = sqlite::relation_destinations(conn, record.id, RelationKind::Definition)?;
    sqlite::remove_relations(conn, record.id, RelationKind::Definition)?;

    let mut current = Vec::with_capacity(entry.definitions.len());
    for (i, gloss) in entry.definitions.iter().enumerate() {
        let definition = canonical::bind(conn, &entry.definition_title(i + 1), RecordKind::Definition)?;
        let definition = sqlite::update_content(conn, definition.id, Some(gloss.as_str()))?;
        sqlite::insert_relation(conn, &Relation::checked(record, RelationKind::Definition, &definition)?)?;
        current.push(definition.id);
        stats.definitions += 1;
    }

    for stale in previous.into_iter().filter(|id| !current.contains(id)) {
        sqlite::delete_record(conn, stale)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use std::io::Cursor;

    fn driver(options: IngestOptions) -> (SqliteStore, IngestDriver) {
        let store = SqliteStore::open_in_memory().unwrap();
        let driver = IngestDriver::new(DeferredResolver::new(&store), options);
        (store, driver)
    }

    const SCENARIO: &str = r#"
{"title": "chien", "text": "{{PatternA}} Mammifère carnivore."}
{"title": "chat", "text": "{{PatternA}} Petit félin."}
{"title": "PatternA", "kind": "pattern", "text": "NOUN"}
"#;

    #[test]
    fn test_scenario_links_both_referencers() {
        let (store, driver) = driver(IngestOptions::default());
        let stats = driver.run(Cursor::new(SCENARIO)).unwrap();

        assert_eq!(stats.entries, 3);
        assert_eq!(stats.registered, 2);
        assert_eq!(stats.transferred, 2);

        let pattern = store.find("PatternA").unwrap().unwrap();
        assert_eq!(pattern.content.as_deref(), Some("NOUN"));
        for title in ["chien", "chat"] {
            let record = store.find(title).unwrap().unwrap();
            assert_eq!(store.relations_from(record.id).unwrap(), vec![Relation {
                source: record.id,
                kind: RelationKind::Pattern,
                destination: pattern.id,
            }]);
        }
        assert!(driver.resolver().pending().entries_for("PatternA").unwrap().is_empty());
    }

    #[test]
    fn test_late_reference_links_directly() {
        let (store, driver) = driver(IngestOptions::default());
        let input = format!("{SCENARIO}\n{{\"title\": \"loup\", \"text\": \"{{{{PatternA}}}}\"}}\n");
        let stats = driver.run(Cursor::new(input)).unwrap();

        assert_eq!(stats.linked_directly, 1);
        let pattern = store.find("PatternA").unwrap().unwrap();
        assert_eq!(store.relations_to(pattern.id).unwrap().len(), 3);
        assert!(driver.resolver().pending().is_empty().unwrap());
    }

    #[test]
    fn test_strict_mode_strands_late_reference() {
        let (store, driver) = driver(IngestOptions { strict: true, shards: 4 });
        let input = format!("{SCENARIO}\n{{\"title\": \"loup\", \"text\": \"{{{{PatternA}}}}\"}}\n");
        driver.run(Cursor::new(input)).unwrap();

        let loup = store.find("loup").unwrap().unwrap();
        assert!(store.relations_from(loup.id).unwrap().is_empty());
        assert!(driver.resolver().pending().contains("PatternA", loup.id).unwrap());
    }

    #[test]
    fn test_definitions_and_word_relations() {
        let (store, driver) = driver(IngestOptions::default());
        let input = r#"{"title": "chaud", "definitions": ["Qui a de la chaleur.", "Ardent."], "synonyms": ["brûlant"], "antonyms": ["froid"]}"#;
        let stats = driver.run(Cursor::new(input)).unwrap();

        assert_eq!(stats.definitions, 2);
        assert_eq!(stats.word_relations, 2);

        let chaud = store.find("chaud").unwrap().unwrap();
        let defs: Vec<_> = store
            .relations_from(chaud.id)
            .unwrap()
            .into_iter()
            .filter(|r| r.kind == RelationKind::Definition)
            .collect();
        assert_eq!(defs.len(), 2);

        let first = store.find("chaud#1").unwrap().unwrap();
        assert_eq!(first.kind, RecordKind::Definition);
        assert_eq!(first.content.as_deref(), Some("Qui a de la chaleur."));
        assert_eq!(store.find("froid").unwrap().unwrap().kind, RecordKind::Word);
    }

    #[test]
    fn test_reingested_entry_replaces_definitions() {
        let (store, driver) = driver(IngestOptions::default());
        let input = r#"
{"title": "mot", "definitions": ["un", "deux"]}
{"title": "mot", "definitions": ["trois"]}
"#;
        driver.run(Cursor::new(input)).unwrap();

        let mot = store.find("mot").unwrap().unwrap();
        let defs = store.relations_from(mot.id).unwrap();
        assert_eq!(defs.len(), 1);
        let def = store.get(defs[0].destination).unwrap().unwrap();
        assert_eq!(def.content.as_deref(), Some("trois"));

        // The second gloss no longer exists once the word has one definition
        assert!(store.find("mot#2").unwrap().is_none());
        assert_eq!(store.records_by_kind(RecordKind::Definition).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_entry_leaves_nothing_behind() {
        let (store, driver) = driver(IngestOptions::default());
        let input = r#"
{"title": "Nom", "kind": "pattern"}
{"title": "chien", "text": "{{Later}}", "definitions": ["Mammifère."], "synonyms": ["Nom"]}
"#;
        let stats = driver.run(Cursor::new(input)).unwrap();

        assert_eq!(stats.entries, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.registered, 0);
        assert_eq!(stats.definitions, 0);
        assert_eq!(stats.word_relations, 0);
        assert!(stats.failures[0].reason.contains("already exists"));

        assert!(store.find("chien").unwrap().is_none());
        assert!(store.find("chien#1").unwrap().is_none());
        assert!(driver.resolver().pending().is_empty().unwrap());
        assert_eq!(store.count_relations().unwrap(), 0);
        assert_eq!(store.count_records().unwrap(), 1);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let (store, driver) = driver(IngestOptions::default());
        let input: &[u8] = b"{\"title\": \"a\"}\n{\"title\": \"b\xff\"}\n{\"title\": \"c\"}\n";
        let stats = driver.run(Cursor::new(input)).unwrap();

        assert_eq!(stats.entries, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failures[0].line, 2);
        assert!(store.find("c").unwrap().is_some());
    }

    #[test]
    fn test_entry_errors_are_skipped() {
        let (store, driver) = driver(IngestOptions::default());
        let input = r#"
{"title": "Nom", "kind": "pattern"}
{"title": "Nom", "kind": "word"}
{broken
{"title": "ok", "text": "{{mot}}"}
{"title": "mot"}
"#;
        let stats = driver.run(Cursor::new(input)).unwrap();

        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.failures[0].title.as_deref(), Some("Nom"));
        assert_eq!(stats.failures[0].line, 3);
        assert!(stats.failures[1].title.is_none());
        // "mot" is a word, so the pending {{mot}} reference is never transferred
        assert!(store.find("ok").unwrap().is_some());
        assert_eq!(driver.resolver().pending().len().unwrap(), 1);
    }

    #[test]
    fn test_reference_to_word_is_a_mismatch() {
        let (_store, driver) = driver(IngestOptions::default());
        let input = r#"
{"title": "mot"}
{"title": "ok", "text": "{{mot}}"}
"#;
        let stats = driver.run(Cursor::new(input)).unwrap();
        assert_eq!(stats.skipped, 1);
        assert!(stats.failures[0].reason.contains("expects a pattern"));
    }

    #[test]
    fn test_sharded_ingestion_is_order_independent() {
        let (store, driver) = driver(IngestOptions { strict: false, shards: 4 });

        let mut entries = Vec::new();
        let mut line = 0;
        for p in 0..5 {
            for w in 0..20 {
                line += 1;
                let entry = CorpusEntry::new(format!("w{p}_{w}"), RecordKind::Word)
                    .with_text(format!("{{{{P{p}}}}}"));
                entries.push((line, entry));
            }
            line += 1;
            entries.push((line, CorpusEntry::new(format!("P{p}"), RecordKind::Pattern)));
        }

        let stats = driver.run_sharded(entries).unwrap();
        assert_eq!(stats.entries, 105);
        assert_eq!(stats.linked_directly + stats.transferred, 100);

        for p in 0..5 {
            let pattern = store.find(&format!("P{p}")).unwrap().unwrap();
            assert_eq!(store.relations_to(pattern.id).unwrap().len(), 20);
        }
        assert!(driver.resolver().pending().is_empty().unwrap());
    }

    #[test]
    fn test_ingest_dispatches_to_shards() {
        let (store, driver) = driver(IngestOptions { strict: false, shards: 3 });
        let input = format!("{SCENARIO}\n{{broken\n");
        let stats = driver.ingest(Cursor::new(input)).unwrap();

        assert_eq!(stats.entries, 3);
        assert_eq!(stats.skipped, 1);
        let pattern = store.find("PatternA").unwrap().unwrap();
        assert_eq!(store.relations_to(pattern.id).unwrap().len(), 2);
        assert!(driver.resolver().pending().is_empty().unwrap());
    }

    #[test]
    fn test_progress_messages() {
        let (tx, rx) = crossbeam::channel::unbounded();
        let store = SqliteStore::open_in_memory().unwrap();
        let driver = IngestDriver::new(DeferredResolver::new(&store), IngestOptions::default())
            .with_progress(tx);

        driver.run(Cursor::new(SCENARIO)).unwrap();
        drop(driver);

        let lines: Vec<usize> = rx
            .iter()
            .filter_map(|m| match m {
                ProgressMessage::Progress { line, .. } => Some(line),
                _ => None,
            })
            .collect();
        // SCENARIO opens with a blank line
        assert_eq!(lines, vec![2, 3, 4]);
    }
}
