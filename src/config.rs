use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub clustering: ClusteringConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the provider endpoint (Bedrock runtime or Ollama).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_limit")]
    pub default_limit: i64,
    #[serde(default = "default_search_threshold")]
    pub default_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
            default_threshold: default_search_threshold(),
        }
    }
}

fn default_search_limit() -> i64 {
    10
}
fn default_search_threshold() -> f64 {
    0.7
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClusteringConfig {
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
    #[serde(default = "default_max_clusters")]
    pub max_clusters: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_window_days")]
    pub window_days: i64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: default_min_cluster_size(),
            max_clusters: default_max_clusters(),
            similarity_threshold: default_similarity_threshold(),
            window_days: default_window_days(),
        }
    }
}

fn default_min_cluster_size() -> usize {
    3
}
fn default_max_clusters() -> usize {
    10
}
fn default_similarity_threshold() -> f64 {
    0.8
}
fn default_window_days() -> i64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate search defaults
    if config.search.default_limit < 1 {
        anyhow::bail!("search.default_limit must be >= 1");
    }
    if !(0.0..=1.0).contains(&config.search.default_threshold) {
        anyhow::bail!("search.default_threshold must be in [0.0, 1.0]");
    }

    // Validate clustering defaults
    if config.clustering.min_cluster_size < 2 {
        anyhow::bail!("clustering.min_cluster_size must be >= 2");
    }
    if config.clustering.max_clusters < 1 {
        anyhow::bail!("clustering.max_clusters must be >= 1");
    }
    if config.clustering.similarity_threshold <= 0.0 || config.clustering.similarity_threshold > 1.0
    {
        anyhow::bail!("clustering.similarity_threshold must be in (0.0, 1.0]");
    }
    if config.clustering.window_days < 1 {
        anyhow::bail!("clustering.window_days must be >= 1");
    }

    // Validate embedding
    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "bedrock" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, bedrock, or ollama.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let f = write_config("[db]\npath = \"/tmp/ws.sqlite\"\n");
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.embedding.provider, "disabled");
        assert_eq!(cfg.embedding.timeout_secs, 30);
        assert_eq!(cfg.clustering.min_cluster_size, 3);
        assert_eq!(cfg.clustering.max_clusters, 10);
        assert!((cfg.clustering.similarity_threshold - 0.8).abs() < 1e-9);
        assert_eq!(cfg.clustering.window_days, 30);
        assert_eq!(cfg.search.default_limit, 10);
    }

    #[test]
    fn test_min_cluster_size_lower_bound() {
        let f = write_config(
            "[db]\npath = \"/tmp/ws.sqlite\"\n\n[clustering]\nmin_cluster_size = 1\n",
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_similarity_threshold_excludes_zero() {
        let f = write_config(
            "[db]\npath = \"/tmp/ws.sqlite\"\n\n[clustering]\nsimilarity_threshold = 0.0\n",
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_enabled_provider_requires_model_and_dims() {
        let f = write_config("[db]\npath = \"/tmp/ws.sqlite\"\n\n[embedding]\nprovider = \"bedrock\"\n");
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let f = write_config(
            "[db]\npath = \"/tmp/ws.sqlite\"\n\n[embedding]\nprovider = \"openai\"\nmodel = \"m\"\ndims = 8\n",
        );
        assert!(load_config(f.path()).is_err());
    }
}
