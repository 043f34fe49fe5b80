//! TOML configuration.
//!
//! Every section is optional. Environment variables listed in
//! [`apply_env_overrides`] take precedence over the file.

use anyhow::{Context, Result};
use idea_board_core::cluster::ClusterParams;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub clustering: ClusterParams,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/board.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Keep embeddings between list calls for ideas whose text is unchanged.
    #[serde(default = "default_cache")]
    pub cache: bool,
    /// Where fastembed stores downloaded model files.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            url: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            cache: default_cache(),
            cache_dir: None,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_cache() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Upper bound on the embed + cluster path of a list request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Defaults for every section, with environment overrides applied.
    /// Used when no config file exists.
    pub fn minimal() -> Result<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;
        validate(&config)?;
        Ok(config)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    apply_env_overrides(&mut config)?;
    validate(&config)?;

    Ok(config)
}

/// Apply `BOARD_*` environment variables on top of `config`.
///
/// | Variable | Field |
/// |----------|-------|
/// | `BOARD_DB_PATH` | `db.path` |
/// | `BOARD_EMBEDDING_PROVIDER` | `embedding.provider` |
/// | `BOARD_EMBEDDING_MODEL` | `embedding.model` |
/// | `BOARD_CLUSTER_EPS` | `clustering.eps` |
/// | `BOARD_CLUSTER_MIN_SAMPLES` | `clustering.min_samples` |
/// | `BOARD_BIND` | `server.bind` |
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(path) = env_var("BOARD_DB_PATH") {
        config.db.path = PathBuf::from(path);
    }
    if let Some(provider) = env_var("BOARD_EMBEDDING_PROVIDER") {
        config.embedding.provider = provider;
    }
    if let Some(model) = env_var("BOARD_EMBEDDING_MODEL") {
        config.embedding.model = Some(model);
    }
    if let Some(eps) = env_var("BOARD_CLUSTER_EPS") {
        config.clustering.eps = eps
            .parse()
            .with_context(|| format!("BOARD_CLUSTER_EPS is not a number: '{}'", eps))?;
    }
    if let Some(min_samples) = env_var("BOARD_CLUSTER_MIN_SAMPLES") {
        config.clustering.min_samples = min_samples.parse().with_context(|| {
            format!(
                "BOARD_CLUSTER_MIN_SAMPLES is not a non-negative integer: '{}'",
                min_samples
            )
        })?;
    }
    if let Some(bind) = env_var("BOARD_BIND") {
        config.server.bind = bind;
    }
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn validate(config: &Config) -> Result<()> {
    config
        .clustering
        .validate()
        .context("Invalid [clustering] section")?;

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }
    if config.embedding.dims == Some(0) {
        anyhow::bail!("embedding.dims must be > 0");
    }

    match config.embedding.provider.as_str() {
        "local" | "hashing" => {}
        "ollama" => {
            if config.embedding.model.is_none() {
                anyhow::bail!("embedding.model must be specified when provider is 'ollama'");
            }
        }
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be local, ollama, or hashing.",
            other
        ),
    }

    if config.server.request_timeout_secs == 0 {
        anyhow::bail!("server.request_timeout_secs must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_text: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_text)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.embedding.provider, "local");
        assert!((config.clustering.eps - 0.60).abs() < 1e-6);
        assert_eq!(config.clustering.min_samples, 1);
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert!(config.embedding.cache);
    }

    #[test]
    fn test_clustering_section() {
        let config = parse("[clustering]\neps = 0.35\nmin_samples = 2\n").unwrap();
        assert!((config.clustering.eps - 0.35).abs() < 1e-6);
        assert_eq!(config.clustering.min_samples, 2);
    }

    #[test]
    fn test_invalid_clustering_rejected() {
        assert!(parse("[clustering]\neps = -0.1\n").is_err());
        assert!(parse("[clustering]\nmin_samples = 0\n").is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = parse("[embedding]\nprovider = \"magic\"\n").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_ollama_requires_model() {
        assert!(parse("[embedding]\nprovider = \"ollama\"\n").is_err());
        assert!(parse("[embedding]\nprovider = \"ollama\"\nmodel = \"nomic-embed-text\"\n").is_ok());
    }

    #[test]
    fn test_load_config_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("board.toml");
        std::fs::write(
            &path,
            "[db]\npath = \"/tmp/x.sqlite\"\n[embedding]\nprovider = \"hashing\"\ndims = 64\n",
        )
        .unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.db.path, PathBuf::from("/tmp/x.sqlite"));
        assert_eq!(config.embedding.dims, Some(64));
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/board.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
