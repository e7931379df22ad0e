#![allow(dead_code)]

use quill::db;
use quill::journal::entries::{create_entry, NewEntry};
use rusqlite::Connection;

/// Fresh in-memory journal with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

/// Insert an entry with tags, returning its id.
pub fn add_entry(conn: &mut Connection, content: &str, tags: &[&str]) -> i64 {
    create_entry(
        conn,
        NewEntry {
            content: content.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        },
    )
    .unwrap()
    .id
}

/// Insert an entry with a type and optional significance.
pub fn add_typed_entry(
    conn: &mut Connection,
    content: &str,
    entry_type: &str,
    significance: Option<&str>,
) -> i64 {
    create_entry(
        conn,
        NewEntry {
            content: content.to_string(),
            entry_type: Some(entry_type.to_string()),
            significance: significance.map(str::to_string),
            ..Default::default()
        },
    )
    .unwrap()
    .id
}
