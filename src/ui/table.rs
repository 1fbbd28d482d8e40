use tabled::{settings::Style, Table, Tabled};
use crate::pending::PendingEntry;
use crate::storage::DbStats;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct PendingRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Referencer")]
    referencer: String,
    #[tabled(rename = "Id")]
    id: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Records", stats.records);
    builder.add_row("  words", stats.words);
    builder.add_row("  definitions", stats.definitions);
    builder.add_row("  patterns", stats.patterns);
    builder.add_row("Relations", stats.relations);
    builder.add_row("Pending entries", stats.pending);
    builder.add_row("Pending names", stats.pending_names);
    builder.build()
}

pub fn pending_table(entries: &[PendingEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let rows: Vec<PendingRow> = entries
        .iter()
        .map(|e| PendingRow {
            name: e.name.clone(),
            referencer: e.referencer_title.clone(),
            id: e.referencer.to_string(),
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordId;

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(TableBuilder::new().build().is_empty());
        assert!(pending_table(&[]).is_empty());
    }

    #[test]
    fn test_pending_table_lists_referencers() {
        let entries = vec![PendingEntry {
            name: "PatternA".to_string(),
            referencer: RecordId(7),
            referencer_title: "chien".to_string(),
        }];
        let table = pending_table(&entries);
        assert!(table.contains("PatternA"));
        assert!(table.contains("chien"));
        assert!(table.contains("#7"));
    }
}
