//! Semantic index over journal entries.
//!
//! Embeddings live in their own SQLite file next to the journal (a vec0
//! virtual table), so journal backups stay small and a lost or stale index
//! is always recoverable by reindexing. The manager initializes lazily on
//! first use; if the embedding model is unavailable every vector operation
//! degrades to a no-op instead of failing the journal.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::config::{QuillConfig, SearchConfig};
use crate::embedding::{create_embedder, Embedder, EMBEDDING_DIM};

type EmbedderFactory = Box<dyn Fn() -> Result<Box<dyn Embedder>> + Send + Sync>;

enum VectorState {
    Uninitialized,
    // Observable only if initialization panics mid-flight
    Initializing,
    Ready(Backend),
}

struct Backend {
    conn: Connection,
    embedder: Box<dyn Embedder>,
}

/// One semantic search hit. Hydration against the journal happens in the
/// caller, which also filters out entries deleted since indexing.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticHit {
    pub entry_id: i64,
    /// Cosine similarity in `[0.0, 1.0]` for normalized vectors.
    pub similarity: f64,
}

/// Index status snapshot for diagnostics.
#[derive(Debug, Serialize)]
pub struct VectorStats {
    pub state: String,
    pub indexed_entries: Option<u64>,
    pub model: String,
    pub dimensions: usize,
}

/// Lazily-initialized semantic index. All methods are synchronous and
/// internally locked; async callers use `spawn_blocking`.
pub struct VectorManager {
    index_path: PathBuf,
    model_name: String,
    search: SearchConfig,
    factory: EmbedderFactory,
    state: Mutex<VectorState>,
}

impl VectorManager {
    pub fn new(config: &QuillConfig) -> Self {
        let embedding = config.embedding.clone();
        Self {
            index_path: config.resolved_vector_path(),
            model_name: config.embedding.model.clone(),
            search: config.search.clone(),
            factory: Box::new(move || create_embedder(&embedding)),
            state: Mutex::new(VectorState::Uninitialized),
        }
    }

    #[cfg(test)]
    fn with_factory(index_path: PathBuf, search: SearchConfig, factory: EmbedderFactory) -> Self {
        Self {
            index_path,
            model_name: "test-embedder".into(),
            search,
            factory,
            state: Mutex::new(VectorState::Uninitialized),
        }
    }

    /// Initialize eagerly. Idempotent; a failed attempt leaves the manager
    /// uninitialized and retryable.
    pub fn initialize(&self) -> Result<()> {
        let mut state = self.lock_state();
        self.ensure_ready(&mut state).map(|_| ())
    }

    /// Index (or re-index) one entry. Returns `false` without erroring when
    /// the index is unavailable; a later reindex repairs the gap.
    pub fn index_entry(&self, entry_id: i64, text: &str) -> bool {
        let mut state = self.lock_state();
        let backend = match self.ensure_ready(&mut state) {
            Ok(b) => b,
            Err(err) => {
                tracing::warn!(entry_id, error = %err, "semantic index unavailable, skipping");
                return false;
            }
        };
        match embed_and_upsert(backend, entry_id, text) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(entry_id, error = %err, "failed to index entry");
                false
            }
        }
    }

    /// Drop an entry from the index. Missing rows and an unavailable index
    /// both report `false`; neither is an error.
    pub fn remove_entry(&self, entry_id: i64) -> bool {
        let mut state = self.lock_state();
        let backend = match self.ensure_ready(&mut state) {
            Ok(b) => b,
            Err(_) => return false,
        };
        match backend
            .conn
            .execute("DELETE FROM entry_vectors WHERE entry_id = ?1", params![entry_id])
        {
            Ok(n) => n > 0,
            Err(err) => {
                tracing::warn!(entry_id, error = %err, "failed to remove entry vector");
                false
            }
        }
    }

    /// KNN search over the index. Returns an empty list when the index
    /// cannot be initialized, so lexical search keeps working without it.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<SemanticHit>> {
        if query.trim().is_empty() {
            return Ok(vec![]);
        }
        let mut state = self.lock_state();
        let backend = match self.ensure_ready(&mut state) {
            Ok(b) => b,
            Err(err) => {
                tracing::warn!(error = %err, "semantic search degraded to empty results");
                return Ok(vec![]);
            }
        };

        let query_vec = backend.embedder.encode(query)?;
        // Oversample so the similarity threshold can drop weak tail hits
        // without starving the requested limit.
        let candidates = (limit * 2).max(limit);
        let mut stmt = backend.conn.prepare(
            "SELECT entry_id, distance FROM entry_vectors \
             WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(
                params![vector_bytes(&query_vec), candidates as i64],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let threshold = self.search.similarity_threshold;
        let mut hits: Vec<SemanticHit> = rows
            .into_iter()
            .map(|(entry_id, distance)| SemanticHit {
                entry_id,
                // L2 distance between unit vectors: d^2 = 2 - 2*cos
                similarity: 1.0 - (distance * distance) / 2.0,
            })
            .filter(|h| h.similarity >= threshold)
            .collect();
        hits.truncate(limit);
        Ok(hits)
    }

    /// Rebuild the whole index from the journal. Entries that fail to embed
    /// are skipped and logged; the count of indexed entries is returned.
    pub fn rebuild(&self, journal: &Connection) -> Result<usize> {
        let mut state = self.lock_state();
        let backend = self.ensure_ready(&mut state)?;

        let mut stmt = journal.prepare(
            "SELECT id, content FROM entries WHERE deleted_at IS NULL \
             ORDER BY id LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![self.search.rebuild_max_entries as i64], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        backend.conn.execute("DELETE FROM entry_vectors", [])?;

        let mut indexed = 0usize;
        for (entry_id, content) in entries {
            let text = document_text(journal, entry_id, &content)?;
            match embed_and_upsert(backend, entry_id, &text) {
                Ok(()) => indexed += 1,
                Err(err) => {
                    tracing::warn!(entry_id, error = %err, "skipping entry during reindex")
                }
            }
        }
        tracing::info!(indexed, "semantic index rebuilt");
        Ok(indexed)
    }

    pub fn stats(&self) -> VectorStats {
        let state = self.lock_state();
        match &*state {
            VectorState::Uninitialized => VectorStats {
                state: "uninitialized".into(),
                indexed_entries: None,
                model: self.model_name.clone(),
                dimensions: EMBEDDING_DIM,
            },
            VectorState::Initializing => VectorStats {
                state: "initializing".into(),
                indexed_entries: None,
                model: self.model_name.clone(),
                dimensions: EMBEDDING_DIM,
            },
            VectorState::Ready(backend) => {
                let count = backend
                    .conn
                    .query_row("SELECT COUNT(*) FROM entry_vectors", [], |r| {
                        r.get::<_, i64>(0)
                    })
                    .ok();
                VectorStats {
                    state: "ready".into(),
                    indexed_entries: count.map(|c| c as u64),
                    model: self.model_name.clone(),
                    dimensions: backend.embedder.dimensions(),
                }
            }
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, VectorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Transition to Ready, loading the embedder and opening the index file.
    /// On failure the state rolls back to Uninitialized so the next call
    /// retries from scratch.
    fn ensure_ready<'a>(
        &self,
        state: &'a mut VectorState,
    ) -> Result<&'a mut Backend> {
        if !matches!(*state, VectorState::Ready(_)) {
            *state = VectorState::Initializing;
            match self.open_backend() {
                Ok(backend) => *state = VectorState::Ready(backend),
                Err(err) => {
                    *state = VectorState::Uninitialized;
                    return Err(err);
                }
            }
        }
        match state {
            VectorState::Ready(backend) => Ok(backend),
            _ => unreachable!(),
        }
    }

    fn open_backend(&self) -> Result<Backend> {
        let embedder = (self.factory)()?;
        crate::db::load_sqlite_vec();
        if let Some(parent) = self.index_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let conn = Connection::open(&self.index_path)
            .with_context(|| format!("opening vector index at {}", self.index_path.display()))?;
        init_index_schema(&conn, &self.model_name)?;
        tracing::info!(path = %self.index_path.display(), "semantic index ready");
        Ok(Backend { conn, embedder })
    }
}

/// The text actually embedded for an entry: content plus its tag names, so
/// tag vocabulary contributes to semantic matching.
pub fn document_text(journal: &Connection, entry_id: i64, content: &str) -> Result<String> {
    let tags = crate::journal::tags::tags_for_entry(journal, entry_id)?;
    if tags.is_empty() {
        Ok(content.to_string())
    } else {
        Ok(format!("{content}\ntags: {}", tags.join(", ")))
    }
}

fn init_index_schema(conn: &Connection, model: &str) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS entry_vectors USING vec0(
            entry_id INTEGER PRIMARY KEY,
            embedding FLOAT[{EMBEDDING_DIM}]
        );
        CREATE TABLE IF NOT EXISTS vector_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );"
    ))?;

    let recorded: Option<String> = conn
        .query_row(
            "SELECT value FROM vector_meta WHERE key = 'model'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    match recorded {
        Some(ref m) if m != model => {
            // Vectors from a different model are not comparable; start over.
            tracing::warn!(old = %m, new = %model, "embedding model changed, clearing index");
            conn.execute("DELETE FROM entry_vectors", [])?;
            conn.execute(
                "UPDATE vector_meta SET value = ?1 WHERE key = 'model'",
                params![model],
            )?;
        }
        Some(_) => {}
        None => {
            conn.execute(
                "INSERT INTO vector_meta (key, value) VALUES ('model', ?1)",
                params![model],
            )?;
        }
    }
    Ok(())
}

/// Upsert one embedding. vec0 has no ON CONFLICT, so delete-then-insert.
fn embed_and_upsert(backend: &mut Backend, entry_id: i64, text: &str) -> Result<()> {
    let vector = backend.embedder.encode(text)?;
    anyhow::ensure!(
        vector.len() == EMBEDDING_DIM,
        "embedder produced {} dims, index expects {EMBEDDING_DIM}",
        vector.len()
    );
    backend
        .conn
        .execute("DELETE FROM entry_vectors WHERE entry_id = ?1", params![entry_id])?;
    backend.conn.execute(
        "INSERT INTO entry_vectors (entry_id, embedding) VALUES (?1, ?2)",
        params![entry_id, vector_bytes(&vector)],
    )?;
    Ok(())
}

/// View an f32 slice as the raw little-endian bytes sqlite-vec expects.
fn vector_bytes(vector: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            vector.as_ptr() as *const u8,
            vector.len() * std::mem::size_of::<f32>(),
        )
    }
}
