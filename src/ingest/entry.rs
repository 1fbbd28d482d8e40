//! Corpus entries - one JSON object per line
//!
//! ```text
//! {"title": "chien", "text": "{{PatternA}} Mammifère.", "definitions": ["..."], "synonyms": ["toutou"]}
//! {"title": "PatternA", "kind": "pattern", "text": "NOUN"}
//! ```
//!
//! Only `title` is required; `kind` defaults to `word`. Patterns are
//! referenced from `text` as `{{Name}}` or `{{Name|arg|...}}`.

use std::io::BufRead;
use std::sync::OnceLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::record::RecordKind;
use crate::{Error, Result};

static PATTERN_REF: OnceLock<Option<Regex>> = OnceLock::new();

fn pattern_ref() -> Option<&'static Regex> {
    PATTERN_REF
        .get_or_init(|| Regex::new(r"\{\{([^{}|]+)(?:\|[^{}]*)?\}\}").ok())
        .as_ref()
}

/// A single corpus entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub title: String,
    #[serde(default = "default_kind")]
    pub kind: RecordKind,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub definitions: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
}

fn default_kind() -> RecordKind {
    RecordKind::Word
}

impl CorpusEntry {
    /// Create a bare entry
    pub fn new(title: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            title: title.into(),
            kind,
            text: None,
            definitions: Vec::new(),
            synonyms: Vec::new(),
            antonyms: Vec::new(),
        }
    }

    /// Set the entry text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Parse one line. Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let entry: CorpusEntry = serde_json::from_str(line)?;
        if entry.title.trim().is_empty() {
            return Err(Error::Parse("entry has an empty title".to_string()));
        }
        Ok(Some(entry))
    }

    /// Pattern names referenced from the text, first occurrence order,
    /// without duplicates or self references
    pub fn pattern_references(&self) -> Vec<String> {
        let (Some(text), Some(re)) = (&self.text, pattern_ref()) else {
            return Vec::new();
        };

        let mut names: Vec<String> = Vec::new();
        for cap in re.captures_iter(text) {
            let name = cap[1].trim();
            if name.is_empty() || name == self.title || names.iter().any(|n| n == name) {
                continue;
            }
            names.push(name.to_string());
        }
        names
    }

    /// Title of the `n`th (1-based) definition record of this entry
    pub fn definition_title(&self, n: usize) -> String {
        format!("{}#{}", self.title, n)
    }
}

/// Iterate over the entries of a JSONL stream.
///
/// Yields `(line_number, entry)` with 1-based line numbers; blank and
/// comment lines are skipped. A line that is not UTF-8 yields a `Parse`
/// error and reading goes on; a read error ends the stream after it is
/// yielded.
pub fn read_entries<R: BufRead>(reader: R) -> impl Iterator<Item = (usize, Result<CorpusEntry>)> {
    let mut failed = false;
    reader
        .split(b'\n')
        .enumerate()
        .map_while(move |(idx, line)| {
            if failed {
                return None;
            }
            let item = match line.map(String::from_utf8) {
                Ok(Ok(line)) => CorpusEntry::parse_line(&line).transpose(),
                Ok(Err(_)) => Some(Err(Error::Parse(format!("line {} is not valid UTF-8", idx + 1)))),
                Err(e) => {
                    failed = true;
                    Some(Err(Error::Io(e)))
                }
            };
            Some((idx + 1, item))
        })
        .filter_map(|(line_no, item)| item.map(|entry| (line_no, entry)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_defaults() {
        let entry = CorpusEntry::parse_line(r#"{"title": "chien"}"#).unwrap().unwrap();
        assert_eq!(entry.kind, RecordKind::Word);
        assert!(entry.text.is_none());
        assert!(entry.definitions.is_empty());
    }

    #[test]
    fn test_parse_skips_blank_and_comments() {
        assert!(CorpusEntry::parse_line("   ").unwrap().is_none());
        assert!(CorpusEntry::parse_line("# dump of 2012-03-01").unwrap().is_none());
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert!(matches!(CorpusEntry::parse_line("{not json"), Err(Error::Json(_))));
        assert!(matches!(CorpusEntry::parse_line(r#"{"title": "  "}"#), Err(Error::Parse(_))));
        assert!(CorpusEntry::parse_line(r#"{"title": "x", "kind": "verb"}"#).is_err());
    }

    #[test]
    fn test_pattern_references() {
        let entry = CorpusEntry::new("chien", RecordKind::Word)
            .with_text("{{S|nom|fr}} {{PatternA}} un {{ PatternA }} {{chien}} {{m|lang=fr}}");

        assert_eq!(entry.pattern_references(), vec!["S", "PatternA", "m"]);
    }

    #[test]
    fn test_pattern_references_without_text() {
        assert!(CorpusEntry::new("vide", RecordKind::Word).pattern_references().is_empty());
    }

    #[test]
    fn test_read_entries_reports_line_numbers() {
        let input = "{\"title\": \"a\"}\n\n# comment\n{broken\n{\"title\": \"b\"}\n";
        let items: Vec<_> = read_entries(Cursor::new(input)).collect();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].0, 1);
        assert!(items[1].1.is_err());
        assert_eq!(items[1].0, 4);
        assert_eq!(items[2].1.as_ref().unwrap().title, "b");
        assert_eq!(items[2].0, 5);
    }

    #[test]
    fn test_read_entries_continues_after_invalid_utf8() {
        let input: &[u8] = b"{\"title\": \"a\"}\r\n{\"title\": \"b\xff\"}\n{\"title\": \"c\"}";
        let items: Vec<_> = read_entries(Cursor::new(input)).collect();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].1.as_ref().unwrap().title, "a");
        assert!(matches!(&items[1].1, Err(Error::Parse(msg)) if msg.contains("line 2")));
        assert_eq!(items[2].0, 3);
        assert_eq!(items[2].1.as_ref().unwrap().title, "c");
    }
}
