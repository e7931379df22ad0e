use anyhow::Result;

use crate::config::QuillConfig;
use crate::vector::VectorManager;

/// `quill reindex`: rebuild the semantic index from the journal.
pub fn reindex(config: &QuillConfig) -> Result<()> {
    let conn = crate::db::open_database(config.resolved_db_path())?;
    let vectors = VectorManager::new(config);

    println!("Rebuilding semantic index (this loads the embedding model)...");
    let indexed = vectors.rebuild(&conn)?;
    println!("Indexed {indexed} entries.");
    Ok(())
}
