//! Snapshot export, listing, pruning, and restore for the journal database.
//!
//! Snapshots use SQLite's online backup API, so they are consistent even
//! while the journal is open under WAL. Restore copies a snapshot's pages
//! back into the live connection, which keeps the connection handle shared
//! with the rest of the server valid. The vector index file is never part
//! of a snapshot; after a restore the index is repaired by reindexing.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::backup::Backup;
use rusqlite::Connection;
use serde::Serialize;

use crate::journal::security::{check_backup_filename, sanitize_snapshot_name};
use crate::journal::JournalError;

const BACKUP_PAGES_PER_STEP: std::ffi::c_int = 64;
const BACKUP_STEP_PAUSE: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize)]
pub struct RestoreReport {
    pub restored_from: String,
    /// Snapshot of the pre-restore state, taken automatically so a bad
    /// restore is itself reversible.
    pub safety_snapshot: String,
    pub live_entries_before: u64,
    pub live_entries_after: u64,
}

/// Write a consistent snapshot of the journal into `backup_dir`.
///
/// `name` is an optional label folded into the filename after
/// sanitization; the timestamp keeps filenames unique either way.
pub fn export_snapshot(
    conn: &Connection,
    backup_dir: &Path,
    name: Option<&str>,
) -> Result<SnapshotInfo> {
    std::fs::create_dir_all(backup_dir)
        .with_context(|| format!("creating backup dir {}", backup_dir.display()))?;

    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let filename = match name.and_then(sanitize_snapshot_name) {
        Some(label) => format!("quill-{label}-{stamp}.db"),
        None => format!("quill-{stamp}.db"),
    };
    let path = backup_dir.join(&filename);

    let mut target = Connection::open(&path)
        .with_context(|| format!("creating snapshot file {}", path.display()))?;
    copy_database(conn, &mut target)?;
    drop(target);

    let size_bytes = std::fs::metadata(&path)?.len();
    tracing::info!(file = %path.display(), size_bytes, "snapshot exported");
    Ok(SnapshotInfo {
        filename,
        path,
        size_bytes,
    })
}

/// Snapshots in the backup directory, newest first.
pub fn list_snapshots(backup_dir: &Path) -> Result<Vec<SnapshotInfo>> {
    if !backup_dir.exists() {
        return Ok(vec![]);
    }
    let mut snapshots = Vec::new();
    for dir_entry in std::fs::read_dir(backup_dir)? {
        let dir_entry = dir_entry?;
        let path = dir_entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("db") {
            continue;
        }
        let meta = dir_entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        snapshots.push((
            meta.modified()?,
            SnapshotInfo {
                filename: filename.to_string(),
                path: path.clone(),
                size_bytes: meta.len(),
            },
        ));
    }
    snapshots.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(snapshots.into_iter().map(|(_, info)| info).collect())
}

/// Delete all but the `keep` newest snapshots. Returns how many were removed.
pub fn prune_snapshots(backup_dir: &Path, keep: usize) -> Result<usize> {
    if keep < 1 {
        return Err(JournalError::validation("must keep at least one snapshot").into());
    }
    let snapshots = list_snapshots(backup_dir)?;
    let mut removed = 0usize;
    for snapshot in snapshots.iter().skip(keep) {
        std::fs::remove_file(&snapshot.path)
            .with_context(|| format!("removing {}", snapshot.path.display()))?;
        removed += 1;
    }
    if removed > 0 {
        tracing::info!(removed, kept = keep.min(snapshots.len()), "snapshots pruned");
    }
    Ok(removed)
}

/// Replace the live journal with the named snapshot.
///
/// The filename is validated against traversal before any filesystem access,
/// and a safety snapshot of the current state is taken before anything is
/// overwritten.
pub fn restore_snapshot(
    conn: &mut Connection,
    backup_dir: &Path,
    filename: &str,
) -> Result<RestoreReport> {
    check_backup_filename(filename)?;

    let path = backup_dir.join(filename);
    if !path.is_file() {
        return Err(JournalError::precondition(format!("snapshot not found: {filename}")).into());
    }

    let live_entries_before = count_live_entries(conn)?;
    let safety = export_snapshot(conn, backup_dir, Some("pre-restore"))?;

    let source = Connection::open(&path)
        .with_context(|| format!("opening snapshot {}", path.display()))?;
    copy_database(&source, conn)?;
    drop(source);

    // Snapshots taken by an older binary may carry an older schema.
    crate::db::migrations::run_migrations(conn)?;

    let live_entries_after = count_live_entries(conn)?;
    tracing::info!(
        from = filename,
        live_entries_before,
        live_entries_after,
        "journal restored from snapshot"
    );
    Ok(RestoreReport {
        restored_from: filename.to_string(),
        safety_snapshot: safety.filename,
        live_entries_before,
        live_entries_after,
    })
}

/// Page-by-page online copy of `source` into `target`, replacing target's
/// contents entirely.
fn copy_database(source: &Connection, target: &mut Connection) -> Result<()> {
    let backup = Backup::new(source, target).context("starting database copy")?;
    backup
        .run_to_completion(BACKUP_PAGES_PER_STEP, BACKUP_STEP_PAUSE, None)
        .context("copying database pages")?;
    Ok(())
}

fn count_live_entries(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE deleted_at IS NULL",
        [],
        |r| r.get(0),
    )?;
    Ok(count as u64)
}
