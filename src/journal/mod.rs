//! Core journal engine: entries, tags, relationships, search, and analytics.
//!
//! Every function here takes an explicit [`rusqlite::Connection`] rather than
//! touching shared module state, so tests run against isolated per-test
//! databases. Mutating operations pre-check entry existence before touching
//! rows, so callers get a clear "entry N not found" instead of a foreign-key
//! constraint error, and soft-deleted entries stay invisible on every path.

pub mod analytics;
pub mod entries;
pub mod error;
pub mod relations;
pub mod search;
pub mod security;
pub mod tags;
pub mod types;

pub use error::JournalError;

use rusqlite::{params, Connection};

/// Current time in the format every table stores: RFC 3339 UTC.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// True when an entry exists and has not been soft-deleted.
pub(crate) fn entry_is_live(conn: &Connection, entry_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM entries WHERE id = ?1 AND deleted_at IS NULL",
        params![entry_id],
        |row| row.get(0),
    )
}
