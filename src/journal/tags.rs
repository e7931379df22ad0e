//! Auto-managed tag vocabulary.
//!
//! Tags are created on first reference (find-or-create), so a "tag not
//! found" failure cannot happen on the write path. `usage_count` is
//! authoritative: incremented only when a join row is genuinely created,
//! decremented when one is removed.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;

use super::error::JournalError;
use super::types::Tag;

/// Result of a tag merge.
#[derive(Debug, Serialize)]
pub struct MergeResult {
    /// Entries that gained a new link to the target, not the raw source
    /// link count, to avoid double-linking entries tagged with both.
    pub entries_updated: usize,
    pub source_deleted: bool,
}

/// Link tags to a live entry, auto-creating unknown names. Idempotent:
/// relinking an already-linked tag touches neither the join nor the counter.
pub fn link_tags(conn: &mut Connection, entry_id: i64, names: &[String]) -> Result<Vec<String>> {
    if !super::entry_is_live(conn, entry_id)? {
        return Err(JournalError::precondition(format!("entry {entry_id} not found")).into());
    }
    let tx = conn.transaction()?;
    link_tags_tx(&tx, entry_id, names)?;
    tx.commit()?;
    tags_for_entry(conn, entry_id)
}

/// Transaction-scoped tag linking used by the entry write path.
pub(crate) fn link_tags_tx(tx: &Transaction<'_>, entry_id: i64, names: &[String]) -> Result<()> {
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            return Err(JournalError::validation("tag names must be non-empty").into());
        }
        let tag_id = find_or_create_tag(tx, name)?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO entry_tags (entry_id, tag_id) VALUES (?1, ?2)",
            params![entry_id, tag_id],
        )?;
        if inserted > 0 {
            tx.execute(
                "UPDATE tags SET usage_count = usage_count + 1 WHERE id = ?1",
                params![tag_id],
            )?;
        }
    }
    Ok(())
}

/// Remove every tag link from an entry, decrementing usage counters.
pub(crate) fn unlink_all_tags_tx(tx: &Transaction<'_>, entry_id: i64) -> Result<()> {
    tx.execute(
        "UPDATE tags SET usage_count = MAX(usage_count - 1, 0) \
         WHERE id IN (SELECT tag_id FROM entry_tags WHERE entry_id = ?1)",
        params![entry_id],
    )?;
    tx.execute(
        "DELETE FROM entry_tags WHERE entry_id = ?1",
        params![entry_id],
    )?;
    Ok(())
}

/// Find a tag by exact (case-sensitive) name, creating it at zero usage if
/// absent. Returns the tag id.
fn find_or_create_tag(conn: &Transaction<'_>, name: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO tags (name, usage_count) VALUES (?1, 0)",
        params![name],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Names of the tags currently applied to an entry, alphabetical.
pub fn tags_for_entry(conn: &Connection, entry_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name FROM tags t \
         JOIN entry_tags et ON et.tag_id = t.id \
         WHERE et.entry_id = ?1 ORDER BY t.name",
    )?;
    let names = stmt
        .query_map(params![entry_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

/// The whole vocabulary, ordered by usage count descending.
pub fn list_tags(conn: &Connection) -> Result<Vec<Tag>> {
    let mut stmt =
        conn.prepare("SELECT id, name, usage_count FROM tags ORDER BY usage_count DESC, name")?;
    let tags = stmt
        .query_map([], |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
                usage_count: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// Merge the source tag into the target tag by name.
///
/// The target is found-or-created. Every *live* entry linked to the source is
/// re-linked to the target unless already linked; the target's counter grows
/// by exactly the number of links actually created. All source links and the
/// source tag row are removed unconditionally, even for entries that needed
/// no re-linking. A missing source is a precondition failure.
pub fn merge_tags(conn: &mut Connection, source: &str, target: &str) -> Result<MergeResult> {
    if source == target {
        return Err(JournalError::validation("cannot merge a tag into itself").into());
    }

    let tx = conn.transaction()?;

    let source_id: Option<i64> = tx
        .query_row("SELECT id FROM tags WHERE name = ?1", params![source], |r| {
            r.get(0)
        })
        .optional()?;
    let source_id = source_id
        .ok_or_else(|| JournalError::precondition(format!("source tag not found: {source}")))?;

    let target_id = find_or_create_tag(&tx, target)?;

    // Live entries tagged with the source but not yet with the target.
    let mut stmt = tx.prepare(
        "SELECT et.entry_id FROM entry_tags et \
         JOIN entries e ON e.id = et.entry_id \
         WHERE et.tag_id = ?1 AND e.deleted_at IS NULL \
           AND et.entry_id NOT IN (SELECT entry_id FROM entry_tags WHERE tag_id = ?2)",
    )?;
    let movable: Vec<i64> = stmt
        .query_map(params![source_id, target_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    drop(stmt);

    for entry_id in &movable {
        tx.execute(
            "INSERT INTO entry_tags (entry_id, tag_id) VALUES (?1, ?2)",
            params![entry_id, target_id],
        )?;
    }
    if !movable.is_empty() {
        tx.execute(
            "UPDATE tags SET usage_count = usage_count + ?1 WHERE id = ?2",
            params![movable.len() as i64, target_id],
        )?;
    }

    // Source disappears entirely, links included.
    tx.execute("DELETE FROM entry_tags WHERE tag_id = ?1", params![source_id])?;
    tx.execute("DELETE FROM tags WHERE id = ?1", params![source_id])?;

    tx.commit()?;

    tracing::info!(source, target, moved = movable.len(), "tags merged");
    Ok(MergeResult {
        entries_updated: movable.len(),
        source_deleted: true,
    })
}
