//! SQL DDL for the journal tables.
//!
//! Defines `entries`, `tags`, `entry_tags`, `relationships`, and
//! `schema_meta`. All DDL uses `IF NOT EXISTS` for idempotent
//! initialization. The vector index lives in a separate file owned by the
//! [`crate::vector`] module and is not part of this schema.

use rusqlite::Connection;

/// All schema DDL statements for the journal file.
const SCHEMA_SQL: &str = r#"
-- Journal entries: the aggregate root. Ids are never reused (AUTOINCREMENT).
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_type TEXT NOT NULL DEFAULT 'personal_reflection',
    content TEXT NOT NULL CHECK(length(content) > 0),
    timestamp TEXT NOT NULL,
    is_personal INTEGER NOT NULL DEFAULT 0,
    significance TEXT,
    deleted_at TEXT,
    issue_number INTEGER,
    pr_number INTEGER,
    workflow_run_id INTEGER,
    github_url TEXT,
    github_status TEXT,
    context TEXT
);

CREATE INDEX IF NOT EXISTS idx_entries_timestamp ON entries(timestamp);
CREATE INDEX IF NOT EXISTS idx_entries_type ON entries(entry_type);
CREATE INDEX IF NOT EXISTS idx_entries_deleted ON entries(deleted_at);
CREATE INDEX IF NOT EXISTS idx_entries_significance ON entries(significance);

-- Tag vocabulary with a denormalized usage counter.
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    usage_count INTEGER NOT NULL DEFAULT 0 CHECK(usage_count >= 0)
);

-- Many-to-many entry/tag links.
CREATE TABLE IF NOT EXISTS entry_tags (
    entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (entry_id, tag_id)
);

CREATE INDEX IF NOT EXISTS idx_entry_tags_tag ON entry_tags(tag_id);

-- Typed, directed edges between entries.
CREATE TABLE IF NOT EXISTS relationships (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    from_entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    to_entry_id INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
    type TEXT NOT NULL CHECK(type IN ('references','implements','clarifies','blocked_by','resolved','caused')),
    description TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_relationships_from ON relationships(from_entry_id);
CREATE INDEX IF NOT EXISTS idx_relationships_to ON relationships(to_entry_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"entries".to_string()));
        assert!(tables.contains(&"tags".to_string()));
        assert!(tables.contains(&"entry_tags".to_string()));
        assert!(tables.contains(&"relationships".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap(); // second call should not error
    }

    #[test]
    fn empty_content_is_rejected_at_the_schema_level() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO entries (content, timestamp) VALUES ('', '2026-01-01T00:00:00+00:00')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn relationship_type_is_a_closed_set() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO entries (content, timestamp) VALUES ('a', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO entries (content, timestamp) VALUES ('b', '2026-01-01T00:00:00+00:00')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO relationships (from_entry_id, to_entry_id, type, created_at) \
             VALUES (1, 2, 'frobnicates', '2026-01-01T00:00:00+00:00')",
            [],
        );
        assert!(result.is_err());
    }
}
