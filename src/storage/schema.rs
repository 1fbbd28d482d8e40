//! Database schema definitions

/// SQL to create the records table
///
/// The UNIQUE title column is the canonical index: title → record id.
pub const CREATE_RECORDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL,
    content TEXT
)
"#;

/// SQL to create the relations table
pub const CREATE_RELATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS relations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    destination_id INTEGER NOT NULL,
    UNIQUE(source_id, kind, destination_id)
)
"#;

/// SQL to create the pending_references table
/// Multi-map from a not-yet-resolved name to the records that mentioned it
pub const CREATE_PENDING_REFERENCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS pending_references (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    referencer_id INTEGER NOT NULL,
    UNIQUE(name, referencer_id)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_records_kind ON records(kind)",
    "CREATE INDEX IF NOT EXISTS idx_relations_source ON relations(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_relations_destination ON relations(destination_id)",
    "CREATE INDEX IF NOT EXISTS idx_relations_kind ON relations(kind)",
    "CREATE INDEX IF NOT EXISTS idx_pending_name ON pending_references(name)",
    "CREATE INDEX IF NOT EXISTS idx_pending_referencer ON pending_references(referencer_id)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_RECORDS_TABLE,
        CREATE_RELATIONS_TABLE,
        CREATE_PENDING_REFERENCES_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
