//! all-MiniLM-L6-v2 running locally via ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{Embedder, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;

/// The model was trained with 256-token sequences; longer input is truncated.
const MAX_TOKENS: usize = 256;

pub struct MiniLmEmbedder {
    // ort sessions need &mut for run(); the mutex serializes inference.
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: Tokenizer is Send+Sync and the Session is only touched while
// holding the mutex.
unsafe impl Send for MiniLmEmbedder {}
unsafe impl Sync for MiniLmEmbedder {}

impl MiniLmEmbedder {
    pub fn load(config: &EmbeddingConfig) -> Result<Self> {
        let cache_dir = crate::config::expand_tilde(&config.cache_dir);
        let session = load_session(&cache_dir.join("model.onnx"))?;
        let tokenizer = load_tokenizer(&cache_dir.join("tokenizer.json"))?;
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

fn load_session(model_path: &Path) -> Result<Session> {
    anyhow::ensure!(
        model_path.exists(),
        "model not found at {} (run `quill model download`)",
        model_path.display()
    );
    let session = Session::builder()?
        .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?
        .commit_from_file(model_path)
        .context("failed to load ONNX model")?;
    tracing::info!(model = %model_path.display(), "embedding model loaded");
    Ok(session)
}

fn load_tokenizer(tokenizer_path: &Path) -> Result<Tokenizer> {
    anyhow::ensure!(
        tokenizer_path.exists(),
        "tokenizer not found at {} (run `quill model download`)",
        tokenizer_path.display()
    );
    let mut tokenizer = Tokenizer::from_file(tokenizer_path)
        .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
    tokenizer
        .with_truncation(Some(tokenizers::TruncationParams {
            max_length: MAX_TOKENS,
            ..Default::default()
        }))
        .map_err(|e| anyhow::anyhow!("failed to configure truncation: {e}"))?;
    tokenizer.with_padding(Some(tokenizers::PaddingParams {
        strategy: tokenizers::PaddingStrategy::BatchLongest,
        ..Default::default()
    }));
    Ok(tokenizer)
}

impl Embedder for MiniLmEmbedder {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.encode_batch(&[text])?;
        batch
            .pop()
            .ok_or_else(|| anyhow::anyhow!("inference returned no output for single input"))
    }

    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;
        let batch = encodings.len();
        let padded_len = encodings[0].get_ids().len();

        let mut ids = Vec::with_capacity(batch * padded_len);
        let mut mask = Vec::with_capacity(batch * padded_len);
        for enc in &encodings {
            ids.extend(enc.get_ids().iter().map(|&v| v as i64));
            mask.extend(enc.get_attention_mask().iter().map(|&v| v as i64));
        }

        let shape = vec![batch as i64, padded_len as i64];
        let ids_tensor = Tensor::from_array((shape.clone(), ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape.clone(), mask.clone().into_boxed_slice()))?;
        // Single-segment input: token_type_ids are all zero.
        let segments = vec![0i64; batch * padded_len];
        let segments_tensor = Tensor::from_array((shape, segments.into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("embedding session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! {
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
            "token_type_ids" => segments_tensor,
        })?;

        // Output naming varies between exports; fall back to the first output.
        let hidden = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);
        let (dims, data) = hidden
            .try_extract_tensor::<f32>()
            .context("failed to extract hidden-state tensor")?;
        let dims: &[i64] = &dims;
        anyhow::ensure!(
            dims.len() == 3 && dims[2] == EMBEDDING_DIM as i64,
            "unexpected hidden-state shape {dims:?}, wanted [batch, seq, {EMBEDDING_DIM}]"
        );
        let seq_len = dims[1] as usize;

        let vectors = (0..batch)
            .map(|b| {
                let pooled = mean_pool(data, &mask[b * padded_len..(b + 1) * padded_len], b, seq_len);
                l2_normalize(&pooled)
            })
            .collect();
        Ok(vectors)
    }
}

/// Attention-masked mean over the token axis for one batch row.
fn mean_pool(data: &[f32], mask: &[i64], row: usize, seq_len: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; EMBEDDING_DIM];
    let mut tokens = 0.0f32;
    for s in 0..seq_len {
        if mask[s] == 0 {
            continue;
        }
        let offset = (row * seq_len + s) * EMBEDDING_DIM;
        for d in 0..EMBEDDING_DIM {
            sum[d] += data[offset + d];
        }
        tokens += 1.0;
    }
    if tokens > 0.0 {
        for v in &mut sum {
            *v /= tokens;
        }
    }
    sum
}

/// L2-normalize; a zero vector stays zero.
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_produces_unit_norm() {
        let n = l2_normalize(&[3.0, 4.0]);
        assert!((n[0] - 0.6).abs() < 1e-6);
        assert!((n[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_leaves_zero_vector_alone() {
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn mean_pool_ignores_padding() {
        // Two tokens, second one masked out; dims filled with row index + dim.
        let mut data = vec![0.0f32; 2 * EMBEDDING_DIM];
        for d in 0..EMBEDDING_DIM {
            data[d] = 2.0;
            data[EMBEDDING_DIM + d] = 100.0;
        }
        let pooled = mean_pool(&data, &[1, 0], 0, 2);
        assert!((pooled[0] - 2.0).abs() < 1e-6);
    }

    fn home_config() -> EmbeddingConfig {
        EmbeddingConfig {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir: dirs::home_dir()
                .expect("home dir")
                .join(".quill/models")
                .to_string_lossy()
                .into_owned(),
        }
    }

    #[test]
    #[ignore] // Needs downloaded model files: cargo test -- --ignored
    fn encode_yields_normalized_384_dims() {
        let embedder = MiniLmEmbedder::load(&home_config()).unwrap();
        let v = embedder.encode("fixed the flaky websocket reconnect").unwrap();
        assert_eq!(v.len(), EMBEDDING_DIM);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[test]
    #[ignore]
    fn encode_is_deterministic() {
        let embedder = MiniLmEmbedder::load(&home_config()).unwrap();
        let a = embedder.encode("refactored the retry loop").unwrap();
        let b = embedder.encode("refactored the retry loop").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    #[ignore]
    fn related_texts_score_closer_than_unrelated() {
        let embedder = MiniLmEmbedder::load(&home_config()).unwrap();
        let a = embedder.encode("debugged a database deadlock").unwrap();
        let b = embedder.encode("investigated a deadlock in the db layer").unwrap();
        let c = embedder.encode("planted tomatoes in the garden").unwrap();
        let dot = |x: &[f32], y: &[f32]| -> f32 { x.iter().zip(y).map(|(p, q)| p * q).sum() };
        assert!(dot(&a, &b) > dot(&a, &c));
    }
}
