use anyhow::Result;

use crate::config::QuillConfig;

/// `quill backup create [--name label]`
pub fn create(config: &QuillConfig, name: Option<&str>) -> Result<()> {
    let conn = crate::db::open_database(config.resolved_db_path())?;
    let info = crate::backup::export_snapshot(&conn, &config.resolved_backup_dir(), name)?;
    println!(
        "Snapshot written: {} ({} bytes)",
        info.path.display(),
        info.size_bytes
    );
    Ok(())
}

/// `quill backup list`
pub fn list(config: &QuillConfig) -> Result<()> {
    let snapshots = crate::backup::list_snapshots(&config.resolved_backup_dir())?;
    if snapshots.is_empty() {
        println!("No snapshots found.");
        return Ok(());
    }
    for snapshot in snapshots {
        println!("{:<48} {:>12} bytes", snapshot.filename, snapshot.size_bytes);
    }
    Ok(())
}

/// `quill backup restore <filename>`
pub fn restore(config: &QuillConfig, filename: &str) -> Result<()> {
    let mut conn = crate::db::open_database(config.resolved_db_path())?;
    let report =
        crate::backup::restore_snapshot(&mut conn, &config.resolved_backup_dir(), filename)?;
    println!("Restored from {}", report.restored_from);
    println!(
        "Live entries: {} -> {}",
        report.live_entries_before, report.live_entries_after
    );
    println!("Safety snapshot: {}", report.safety_snapshot);
    println!("Run `quill reindex` to rebuild the semantic index.");
    Ok(())
}

/// `quill backup prune [--keep N]`
pub fn prune(config: &QuillConfig, keep: Option<usize>) -> Result<()> {
    let keep = keep.unwrap_or(config.backup.retain);
    let removed = crate::backup::prune_snapshots(&config.resolved_backup_dir(), keep)?;
    println!("Removed {removed} snapshot(s), keeping the {keep} newest.");
    Ok(())
}
