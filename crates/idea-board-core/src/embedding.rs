//! Embedding provider trait and the dependency-free hashing embedder.
//!
//! Concrete model-backed providers (fastembed, Ollama) live in the
//! `idea-board` app crate. Everything that needs embeddings goes through
//! [`embed_texts`], which owns the empty-batch short-circuit and checks the
//! shape of what a backend returns.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::{BoardError, Result};

/// Trait for embedding providers.
///
/// A provider is built once at startup and shared for the lifetime of the
/// process. Construction is where a missing or broken model must surface
/// as [`BoardError::ModelUnavailable`]; after that, `embed_batch` is
/// expected to be deterministic for identical input.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Encode a non-empty batch, one vector per text in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a batch of texts.
///
/// Returns an empty result for an empty batch without touching the
/// provider. Otherwise the provider's output is checked to contain exactly
/// one vector of [`EmbeddingProvider::dims`] per input.
pub async fn embed_texts(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let vectors = provider.embed_batch(texts).await?;

    if vectors.len() != texts.len() {
        return Err(BoardError::Embedding(format!(
            "{} returned {} vectors for {} texts",
            provider.model_name(),
            vectors.len(),
            texts.len()
        )));
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != provider.dims()) {
        return Err(BoardError::Embedding(format!(
            "{} returned a {}-dimensional vector, expected {}",
            provider.model_name(),
            bad.len(),
            provider.dims()
        )));
    }

    Ok(vectors)
}

// ============ Hashing Provider ============

/// Default bucket count for [`HashingProvider`].
pub const DEFAULT_HASHING_DIMS: usize = 384;

/// Deterministic bag-of-words embedder.
///
/// Each lowercase alphanumeric token is hashed with SHA-256 into one of
/// `dims` buckets with a ±1 sign, and the result is L2-normalized. Texts
/// sharing words end up close in cosine distance; texts with no words in
/// common are orthogonal unless two tokens collide. No model, no network.
///
/// Non-empty text never embeds to the zero vector: when the tokens yield
/// nothing (`"?!"`, emoji) or cancel out, the whole trimmed text is hashed
/// as a single feature instead.
///
/// # Example
///
/// ```rust
/// use idea_board_core::embedding::HashingProvider;
///
/// let provider = HashingProvider::new(64);
/// let v = provider.embed_one("Buy milk");
/// assert_eq!(v.len(), 64);
/// assert_eq!(v, provider.embed_one("buy   MILK!"));
/// ```
pub struct HashingProvider {
    dims: usize,
}

impl HashingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    /// Embed one text synchronously.
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];

        for token in tokenize(text) {
            self.add_feature(&mut v, token.as_bytes());
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() && v.iter().all(|x| *x == 0.0) {
            self.add_feature(&mut v, trimmed.as_bytes());
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }

    fn add_feature(&self, v: &mut [f32], feature: &[u8]) {
        let digest = Sha256::digest(feature);
        let mut bucket_bytes = [0u8; 8];
        bucket_bytes.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(bucket_bytes) % self.dims as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign;
    }
}

impl Default for HashingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn model_name(&self) -> &str {
        "hashing"
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::cosine_distance;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        returned: Vec<Vec<f32>>,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn model_name(&self) -> &str {
            "counting"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.returned.clone())
        }
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_batch_skips_provider() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
            returned: vec![],
        };
        let out = embed_texts(&provider, &[]).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_count_mismatch_is_error() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
            returned: vec![vec![1.0, 0.0]],
        };
        let err = embed_texts(&provider, &texts(&["a", "b"])).await.unwrap_err();
        assert!(matches!(err, BoardError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_dims_mismatch_is_error() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
            returned: vec![vec![1.0, 0.0, 0.0]],
        };
        let err = embed_texts(&provider, &texts(&["a"])).await.unwrap_err();
        assert!(matches!(err, BoardError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_hashing_preserves_order_and_dims() {
        let provider = HashingProvider::new(32);
        let input = texts(&["alpha", "beta", "alpha"]);
        let out = embed_texts(&provider, &input).await.unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| v.len() == 32));
        assert_eq!(out[0], out[2]);
        assert_eq!(out[0], provider.embed_one("alpha"));
    }

    #[test]
    fn test_hashing_is_normalized() {
        let v = HashingProvider::default().embed_one("write the quarterly report");
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_ignores_case_and_punctuation() {
        let p = HashingProvider::default();
        assert_eq!(p.embed_one("Buy milk."), p.embed_one("buy, MILK"));
    }

    #[test]
    fn test_hashing_shared_words_are_close() {
        let p = HashingProvider::default();
        let d = cosine_distance(&p.embed_one("buy milk"), &p.embed_one("buy oat milk"));
        assert!(d < 0.6, "distance {d}");
    }

    #[test]
    fn test_hashing_symbol_only_text_is_not_zero() {
        let p = HashingProvider::new(8);
        for text in ["?!", "\u{1F642}", "---"] {
            let v = p.embed_one(text);
            assert!(v.iter().any(|x| *x != 0.0), "zero vector for {text:?}");
            assert_eq!(v, p.embed_one(text));
        }
        assert_eq!(p.embed_one(" ?! "), p.embed_one("?!"));
    }

    #[test]
    fn test_hashing_blank_text_is_zero_vector() {
        let v = HashingProvider::new(8).embed_one("   ");
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
