//! Text embedding for semantic journal search.
//!
//! [`Embedder`] abstracts the model; the only shipping implementation runs
//! all-MiniLM-L6-v2 locally through ONNX Runtime. Vectors are 384-dim and
//! L2-normalized, so cosine similarity reduces to a dot product.

pub mod local;

use anyhow::Result;

/// Dimensionality of the vectors every [`Embedder`] must produce.
pub const EMBEDDING_DIM: usize = 384;

/// Turns text into a fixed-size normalized vector.
///
/// Methods are synchronous; async callers wrap them in
/// `tokio::task::spawn_blocking`.
pub trait Embedder: Send + Sync {
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Batched encoding. The default delegates to [`Embedder::encode`];
    /// implementations with real batch inference should override it.
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Build the embedder named by config. Fails if the model files are missing;
/// `quill model download` fetches them.
pub fn create_embedder(config: &crate::config::EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "local" => Ok(Box::new(local::MiniLmEmbedder::load(config)?)),
        other => anyhow::bail!("unknown embedding provider {other:?} (supported: local)"),
    }
}
