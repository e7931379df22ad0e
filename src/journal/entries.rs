//! Entry CRUD and soft-delete.
//!
//! Every mutating operation that references an entry id verifies the row
//! exists (and is live) before mutating, so callers get "entry N not found"
//! rather than a constraint violation. Create returns the post-insert
//! read-back, not the in-memory input, so the result reflects exactly what
//! was persisted including the DB-assigned id and timestamp.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::JournalError;
use super::tags;
use super::types::{Entry, GithubLink, DEFAULT_ENTRY_TYPE, MAX_CONTENT_LEN};
use super::{entry_is_live, now_rfc3339};

/// Input for [`create_entry`]. Only `content` is required.
#[derive(Debug, Default)]
pub struct NewEntry {
    pub content: String,
    pub entry_type: Option<String>,
    pub tags: Vec<String>,
    pub is_personal: bool,
    pub significance: Option<String>,
    pub github: Option<GithubLink>,
    pub context: Option<String>,
}

/// Partial update for [`update_entry`]. `None` fields are left untouched;
/// `tags` is a full replacement, not a diff.
#[derive(Debug, Default)]
pub struct UpdateEntry {
    pub content: Option<String>,
    pub entry_type: Option<String>,
    pub is_personal: Option<bool>,
    pub tags: Option<Vec<String>>,
}

/// Column list shared by every entry SELECT in this crate.
pub(crate) const ENTRY_COLUMNS: &str = "id, entry_type, content, timestamp, is_personal, \
     significance, deleted_at, issue_number, pr_number, workflow_run_id, \
     github_url, github_status, context";

/// Exhaustive row-to-domain mapping. Raw row shapes never cross the storage
/// boundary. Tags are filled in by the caller.
pub(crate) fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let github = GithubLink {
        issue_number: row.get(7)?,
        pr_number: row.get(8)?,
        workflow_run_id: row.get(9)?,
        url: row.get(10)?,
        status: row.get(11)?,
    };
    Ok(Entry {
        id: row.get(0)?,
        entry_type: row.get(1)?,
        content: row.get(2)?,
        timestamp: row.get(3)?,
        is_personal: row.get(4)?,
        significance: row.get(5)?,
        deleted_at: row.get(6)?,
        github: if github.is_empty() { None } else { Some(github) },
        context: row.get(12)?,
        tags: Vec::new(),
    })
}

/// Validate content before any I/O.
fn validate_content(content: &str) -> Result<()> {
    if content.is_empty() {
        return Err(JournalError::validation("content must not be empty").into());
    }
    let len = content.chars().count();
    if len > MAX_CONTENT_LEN {
        return Err(JournalError::validation(format!(
            "content exceeds {MAX_CONTENT_LEN} characters (got {len})"
        ))
        .into());
    }
    Ok(())
}

/// Create an entry, linking (and auto-creating) each tag synchronously.
///
/// The semantic index is *not* touched here; indexing is fire-and-forget
/// from the caller so journaling never blocks on embedding availability.
pub fn create_entry(conn: &mut Connection, new: NewEntry) -> Result<Entry> {
    validate_content(&new.content)?;

    let entry_type = new
        .entry_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_ENTRY_TYPE);
    let github = new.github.unwrap_or_default();
    let now = now_rfc3339();

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO entries (entry_type, content, timestamp, is_personal, significance, \
         issue_number, pr_number, workflow_run_id, github_url, github_status, context) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            entry_type,
            new.content,
            now,
            new.is_personal,
            new.significance,
            github.issue_number,
            github.pr_number,
            github.workflow_run_id,
            github.url,
            github.status,
            new.context,
        ],
    )?;
    let id = tx.last_insert_rowid();

    tags::link_tags_tx(&tx, id, &new.tags)?;
    tx.commit()?;

    tracing::info!(id, entry_type, tags = new.tags.len(), "entry created");

    // Post-insert read-back
    read_entry(conn, id, false)?
        .ok_or_else(|| anyhow::anyhow!("entry {id} vanished after insert"))
}

/// Fetch a live entry. Returns `None` for deleted or nonexistent ids;
/// callers cannot distinguish the two through this call.
pub fn get_entry(conn: &Connection, id: i64) -> Result<Option<Entry>> {
    read_entry(conn, id, false)
}

/// History access: fetch an entry whether or not it is soft-deleted.
pub fn get_entry_any(conn: &Connection, id: i64) -> Result<Option<Entry>> {
    read_entry(conn, id, true)
}

fn read_entry(conn: &Connection, id: i64, include_deleted: bool) -> Result<Option<Entry>> {
    let sql = if include_deleted {
        format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1")
    } else {
        format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?1 AND deleted_at IS NULL")
    };
    let entry = conn
        .query_row(&sql, params![id], entry_from_row)
        .optional()?;

    match entry {
        Some(mut entry) => {
            entry.tags = tags::tags_for_entry(conn, id)?;
            Ok(Some(entry))
        }
        None => Ok(None),
    }
}

/// Most recent live entries, timestamp descending with id descending as the
/// tiebreak, deterministic even for same-timestamp bulk inserts.
pub fn list_recent(
    conn: &Connection,
    limit: usize,
    personal: Option<bool>,
) -> Result<Vec<Entry>> {
    let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE deleted_at IS NULL");
    if personal.is_some() {
        sql.push_str(" AND is_personal = ?2");
    }
    sql.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ?1");

    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<Entry> = match personal {
        Some(p) => stmt
            .query_map(params![limit as i64, p], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?,
        None => stmt
            .query_map(params![limit as i64], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?,
    };

    attach_tags(conn, rows)
}

/// Soft-deleted entries, newest deletion first. History access only.
pub fn list_deleted(conn: &Connection) -> Result<Vec<Entry>> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM entries WHERE deleted_at IS NOT NULL \
         ORDER BY deleted_at DESC, id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<Entry> = stmt
        .query_map([], entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    attach_tags(conn, rows)
}

/// Fill in tags for a batch of already-mapped entries.
pub(crate) fn attach_tags(conn: &Connection, mut entries: Vec<Entry>) -> Result<Vec<Entry>> {
    for entry in &mut entries {
        entry.tags = tags::tags_for_entry(conn, entry.id)?;
    }
    Ok(entries)
}

/// Partially update a live entry. Returns `None` (not an error) when the id
/// is missing or soft-deleted; update is idempotent-safe by contract.
pub fn update_entry(
    conn: &mut Connection,
    id: i64,
    update: UpdateEntry,
) -> Result<Option<Entry>> {
    if let Some(ref content) = update.content {
        validate_content(content)?;
    }
    if !entry_is_live(conn, id)? {
        return Ok(None);
    }

    let tx = conn.transaction()?;

    if let Some(ref content) = update.content {
        tx.execute(
            "UPDATE entries SET content = ?1 WHERE id = ?2",
            params![content, id],
        )?;
    }
    if let Some(ref entry_type) = update.entry_type {
        tx.execute(
            "UPDATE entries SET entry_type = ?1 WHERE id = ?2",
            params![entry_type, id],
        )?;
    }
    if let Some(is_personal) = update.is_personal {
        tx.execute(
            "UPDATE entries SET is_personal = ?1 WHERE id = ?2",
            params![is_personal, id],
        )?;
    }
    if let Some(ref new_tags) = update.tags {
        // Full replacement: unlink everything, then relink.
        tags::unlink_all_tags_tx(&tx, id)?;
        tags::link_tags_tx(&tx, id, new_tags)?;
    }

    tx.commit()?;
    tracing::info!(id, "entry updated");
    read_entry(conn, id, false)
}

/// Delete an entry. Returns `false`, never an error, when the id does not
/// exist or is already soft-deleted; deleting what's not there is a no-op
/// success boundary.
///
/// Soft delete sets `deleted_at`; permanent delete removes the row, cascades
/// to tag links and relationships, and decrements tag usage counters.
pub fn delete_entry(conn: &mut Connection, id: i64, permanent: bool) -> Result<bool> {
    if !entry_is_live(conn, id)? {
        return Ok(false);
    }

    if permanent {
        let tx = conn.transaction()?;
        tags::unlink_all_tags_tx(&tx, id)?;
        tx.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        tx.commit()?;
        tracing::info!(id, "entry permanently deleted");
    } else {
        conn.execute(
            "UPDATE entries SET deleted_at = ?1 WHERE id = ?2",
            params![now_rfc3339(), id],
        )?;
        tracing::info!(id, "entry soft-deleted");
    }

    Ok(true)
}

/// Bring a soft-deleted entry back. Returns the restored entry, or `None`
/// when the id does not exist or was never deleted.
pub fn restore_entry(conn: &Connection, id: i64) -> Result<Option<Entry>> {
    let updated = conn.execute(
        "UPDATE entries SET deleted_at = NULL WHERE id = ?1 AND deleted_at IS NOT NULL",
        params![id],
    )?;
    if updated == 0 {
        return Ok(None);
    }
    tracing::info!(id, "entry restored");
    read_entry(conn, id, false)
}
