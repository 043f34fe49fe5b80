//! Model-backed embedding providers.
//!
//! Implements the core [`EmbeddingProvider`] trait for:
//! - **[`LocalProvider`]**: runs a sentence-embedding model locally via
//!   fastembed; no network calls once the model files are cached.
//! - **[`OllamaProvider`]**: calls a local Ollama instance's `/api/embed`
//!   endpoint with batching, retry, and backoff.
//! - **`hashing`**: the core crate's [`HashingProvider`], for offline use.
//!
//! # Provider Selection
//!
//! Use [`create_provider`] once at startup. It loads the model and runs a
//! one-text warm-up encode, so a broken backend surfaces as
//! [`BoardError::ModelUnavailable`] before the server accepts requests:
//!
//! ```rust,no_run
//! # use idea_board::config::EmbeddingConfig;
//! # use idea_board::embedding::create_provider;
//! # async fn example() -> anyhow::Result<()> {
//! let config = EmbeddingConfig {
//!     provider: "hashing".to_string(),
//!     ..EmbeddingConfig::default()
//! };
//! let provider = create_provider(&config).await?;
//! assert_eq!(provider.model_name(), "hashing");
//! # Ok(())
//! # }
//! ```
//!
//! # Retry Strategy
//!
//! The Ollama provider uses exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use idea_board_core::embedding::{EmbeddingProvider, HashingProvider, DEFAULT_HASHING_DIMS};
use idea_board_core::error::{BoardError, Result};

use crate::config::EmbeddingConfig;

const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const WARMUP_TEXT: &str = "warm-up";

/// Create the configured [`EmbeddingProvider`].
///
/// # Supported Providers
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"local"` | [`LocalProvider`] (requires the `local-embeddings-fastembed` feature) |
/// | `"ollama"` | [`OllamaProvider`] |
/// | `"hashing"` | [`HashingProvider`] |
///
/// # Errors
///
/// [`BoardError::ModelUnavailable`] for unknown providers or models, or
/// when the backend cannot produce a warm-up embedding.
pub async fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider.as_str() {
        #[cfg(feature = "local-embeddings-fastembed")]
        "local" => Arc::new(LocalProvider::load(config).await?),
        #[cfg(not(feature = "local-embeddings-fastembed"))]
        "local" => {
            return Err(BoardError::ModelUnavailable(
                "local embedding provider requires --features local-embeddings-fastembed"
                    .to_string(),
            ))
        }
        "ollama" => Arc::new(OllamaProvider::connect(config).await?),
        "hashing" => Arc::new(HashingProvider::new(
            config.dims.unwrap_or(DEFAULT_HASHING_DIMS),
        )),
        other => {
            return Err(BoardError::ModelUnavailable(format!(
                "unknown embedding provider: {}",
                other
            )))
        }
    };

    tracing::info!(
        provider = %config.provider,
        model = provider.model_name(),
        dims = provider.dims(),
        "embedding model ready"
    );
    Ok(provider)
}

// ============ Local Provider (fastembed) ============

/// Embedding provider for local inference via fastembed.
///
/// The ONNX model is downloaded from Hugging Face on first use and cached
/// (see `embedding.cache_dir`). It is loaded exactly once, in
/// [`LocalProvider::load`], and shared by every request afterwards; encode
/// calls take turns on it from the blocking thread pool.
#[cfg(feature = "local-embeddings-fastembed")]
pub struct LocalProvider {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-embeddings-fastembed")]
impl LocalProvider {
    /// Load the configured model and measure its output dimensionality.
    pub async fn load(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());
        let fastembed_model = config_to_fastembed_model(&model_name)?;
        let cache_dir = config.cache_dir.clone();

        tracing::info!(model = %model_name, "loading local embedding model");

        let load_name = model_name.clone();
        let (model, dims) = tokio::task::spawn_blocking(move || {
            let mut options =
                fastembed::InitOptions::new(fastembed_model).with_show_download_progress(false);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            let mut model = fastembed::TextEmbedding::try_new(options).map_err(|e| {
                BoardError::ModelUnavailable(format!("failed to load '{}': {}", load_name, e))
            })?;
            let warmup = model
                .embed(vec![WARMUP_TEXT.to_string()], Some(1))
                .map_err(|e| {
                    BoardError::ModelUnavailable(format!(
                        "warm-up embed with '{}' failed: {}",
                        load_name, e
                    ))
                })?;
            let dims = warmup.first().map(|v| v.len()).unwrap_or(0);
            Ok::<_, BoardError>((model, dims))
        })
        .await
        .map_err(|e| BoardError::ModelUnavailable(format!("model loader panicked: {}", e)))??;

        if dims == 0 {
            return Err(BoardError::ModelUnavailable(format!(
                "'{}' produced an empty warm-up embedding",
                model_name
            )));
        }
        if let Some(configured) = config.dims {
            if configured != dims {
                tracing::warn!(
                    configured,
                    actual = dims,
                    "embedding.dims does not match the model; using the model's"
                );
            }
        }

        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: Arc::new(std::sync::Mutex::new(model)),
        })
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let batch_size = self.batch_size;
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| BoardError::Embedding("local model lock poisoned".to_string()))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| BoardError::Embedding(format!("local embedding failed: {}", e)))
        })
        .await
        .map_err(|e| BoardError::Embedding(format!("embedding task panicked: {}", e)))?
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn config_to_fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML12V2),
        "paraphrase-minilm-l12-v2" => Ok(fastembed::EmbeddingModel::ParaphraseMLMiniLML12V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => Err(BoardError::ModelUnavailable(format!(
            "unknown local embedding model: '{}'. Supported models: \
             all-minilm-l6-v2, all-minilm-l12-v2, paraphrase-minilm-l12-v2, \
             bge-small-en-v1.5, bge-base-en-v1.5, bge-large-en-v1.5, \
             nomic-embed-text-v1, nomic-embed-text-v1.5, \
             multilingual-e5-small, multilingual-e5-base, multilingual-e5-large",
            other
        ))),
    }
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default:
/// `http://localhost:11434`). Requires Ollama to be running with the model
/// pulled (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaProvider {
    model: String,
    dims: usize,
    url: String,
    batch_size: usize,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaProvider {
    /// Build the client and probe the model with a warm-up request.
    pub async fn connect(config: &EmbeddingConfig) -> Result<Self> {
        let model = config.model.clone().ok_or_else(|| {
            BoardError::ModelUnavailable("embedding.model required for Ollama provider".to_string())
        })?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BoardError::ModelUnavailable(e.to_string()))?;

        let mut provider = Self {
            model,
            dims: 0,
            url,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
            client,
        };

        let warmup = provider
            .request(&[WARMUP_TEXT.to_string()])
            .await
            .map_err(|e| {
                BoardError::ModelUnavailable(format!(
                    "Ollama model '{}' at {} is not usable: {}",
                    provider.model, provider.url, e
                ))
            })?;
        provider.dims = warmup.first().map(|v| v.len()).unwrap_or(0);
        if provider.dims == 0 {
            return Err(BoardError::ModelUnavailable(format!(
                "Ollama model '{}' returned an empty warm-up embedding",
                provider.model
            )));
        }

        Ok(provider)
    }

    /// One `/api/embed` call with retry and exponential backoff.
    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(attempt, ?delay, "retrying Ollama embedding request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/api/embed", self.url))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| BoardError::Embedding(e.to_string()))?;
                        return parse_ollama_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = format!("Ollama API error {}: {}", status, body_text);

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(err);
                        continue;
                    }

                    return Err(BoardError::Embedding(err));
                }
                Err(e) => {
                    last_err = Some(format!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url, e
                    ));
                    continue;
                }
            }
        }

        Err(BoardError::Embedding(last_err.unwrap_or_else(|| {
            "Ollama embedding failed after retries".to_string()
        })))
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            vectors.extend(self.request(batch).await?);
        }
        Ok(vectors)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let invalid = |what: &str| BoardError::Embedding(format!("Invalid Ollama response: {}", what));

    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| invalid("missing embeddings array"))?;

    embeddings
        .iter()
        .map(|embedding| {
            embedding
                .as_array()
                .ok_or_else(|| invalid("embedding is not an array"))?
                .iter()
                .map(|v| {
                    v.as_f64()
                        .map(|f| f as f32)
                        .ok_or_else(|| invalid("non-numeric component"))
                })
                .collect()
        })
        .collect()
}
