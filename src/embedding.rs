//! Embedding provider abstraction and implementations.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`DisabledProvider`]** — returns errors; used when embeddings are not configured.
//! - **[`BedrockProvider`]** — calls Amazon Titan multimodal embeddings with
//!   bearer-token auth; the platform's analysis pipeline uses the same model,
//!   so query vectors land in the same space as the stored image embeddings.
//! - **[`OllamaProvider`]** — calls a local Ollama instance's `/api/embed`
//!   endpoint, for offline development against a local model.
//!
//! Also provides the vector codec used by SQLite storage:
//! [`vec_to_blob`] / [`blob_to_vec`] (little-endian f32 bytes).
//!
//! Every provider call is bounded by the configured timeout (default 30 s).
//! A failure, timeout, or a vector of unexpected dimension surfaces as
//! [`Error::EmbeddingUnavailable`] — retryable by the caller, never retried
//! here.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Trait for embedding providers.
///
/// One async entry point: turn a text into a fixed-length float vector
/// comparable with the stored report embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"amazon.titan-embed-image-v1"`).
    fn model_name(&self) -> &str;

    /// Returns the embedding vector dimensionality (e.g. `1024`).
    fn dims(&self) -> usize;

    /// Embed a single query text.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
}

// ============ Disabled Provider ============

/// A no-op embedding provider that always returns errors.
///
/// Used when `embedding.provider = "disabled"` in the configuration.
pub struct DisabledProvider;

#[async_trait]
impl EmbeddingProvider for DisabledProvider {
    fn model_name(&self) -> &str {
        "disabled"
    }
    fn dims(&self) -> usize {
        0
    }
    async fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::EmbeddingUnavailable(
            "embedding provider is disabled; set [embedding] provider in config".to_string(),
        ))
    }
}

// ============ Bedrock (Titan multimodal) Provider ============

/// Embedding provider using Amazon Titan multimodal embeddings.
///
/// Calls `POST {endpoint}/model/{model}/invoke` with bearer-token auth
/// (`AWS_BEARER_TOKEN_BEDROCK`). Titan's multimodal model embeds text and
/// images into the same space, which is what makes text-to-image-report
/// search work.
pub struct BedrockProvider {
    model: String,
    dims: usize,
    endpoint: String,
    timeout_secs: u64,
}

const DEFAULT_BEDROCK_ENDPOINT: &str = "https://bedrock-runtime.us-east-1.amazonaws.com";

impl BedrockProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config.model.clone().ok_or_else(|| {
            Error::Validation("embedding.model required for Bedrock provider".to_string())
        })?;
        let dims = config.dims.ok_or_else(|| {
            Error::Validation("embedding.dims required for Bedrock provider".to_string())
        })?;
        let endpoint = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_BEDROCK_ENDPOINT.to_string());

        if std::env::var("AWS_BEARER_TOKEN_BEDROCK").is_err() {
            return Err(Error::Validation(
                "AWS_BEARER_TOKEN_BEDROCK environment variable not set".to_string(),
            ));
        }

        Ok(Self {
            model,
            dims,
            endpoint,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for BedrockProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let token = std::env::var("AWS_BEARER_TOKEN_BEDROCK")
            .map_err(|_| Error::EmbeddingUnavailable("AWS_BEARER_TOKEN_BEDROCK not set".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        let body = serde_json::json!({
            "inputText": text,
            "embeddingConfig": {
                "outputEmbeddingLength": self.dims,
            },
        });

        let response = client
            .post(format!("{}/model/{}/invoke", self.endpoint, self.model))
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("Bedrock request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingUnavailable(format!(
                "Bedrock API error {status}: {body_text}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("invalid Bedrock response: {e}")))?;

        let vec = parse_embedding_array(
            json.get("embedding")
                .ok_or_else(|| Error::EmbeddingUnavailable("Bedrock response missing embedding".into()))?,
        )?;

        check_dims(&vec, self.dims)?;
        Ok(vec)
    }
}

// ============ Ollama Provider ============

/// Embedding provider using a local Ollama instance.
///
/// Calls `POST /api/embed` on the configured URL (default
/// `http://localhost:11434`). Requires an embedding model pulled locally.
pub struct OllamaProvider {
    model: String,
    dims: usize,
    url: String,
    timeout_secs: u64,
}

impl OllamaProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config.model.clone().ok_or_else(|| {
            Error::Validation("embedding.model required for Ollama provider".to_string())
        })?;
        let dims = config.dims.ok_or_else(|| {
            Error::Validation("embedding.dims required for Ollama provider".to_string())
        })?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            model,
            dims,
            url,
            timeout_secs: config.timeout_secs,
        })
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

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "input": [text],
        });

        let response = client
            .post(format!("{}/api/embed", self.url))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                Error::EmbeddingUnavailable(format!(
                    "Ollama connection error (is Ollama running at {}?): {e}",
                    self.url
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(Error::EmbeddingUnavailable(format!(
                "Ollama API error {status}: {body_text}"
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::EmbeddingUnavailable(format!("invalid Ollama response: {e}")))?;

        let first = json
            .get("embeddings")
            .and_then(|e| e.as_array())
            .and_then(|a| a.first())
            .ok_or_else(|| {
                Error::EmbeddingUnavailable("Ollama response missing embeddings array".into())
            })?;

        let vec = parse_embedding_array(first)?;
        check_dims(&vec, self.dims)?;
        Ok(vec)
    }
}

fn parse_embedding_array(value: &serde_json::Value) -> Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| Error::EmbeddingUnavailable("embedding is not an array".into()))?;
    Ok(arr
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

fn check_dims(vec: &[f32], expected: usize) -> Result<()> {
    if vec.len() != expected {
        return Err(Error::EmbeddingUnavailable(format!(
            "provider returned a {}-dimensional vector, expected {}",
            vec.len(),
            expected
        )));
    }
    Ok(())
}

/// Create the appropriate [`EmbeddingProvider`] based on configuration.
///
/// | Config value | Provider |
/// |--------------|----------|
/// | `"disabled"` | [`DisabledProvider`] |
/// | `"bedrock"`  | [`BedrockProvider`] |
/// | `"ollama"`   | [`OllamaProvider`] |
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledProvider)),
        "bedrock" => Ok(Box::new(BedrockProvider::new(config)?)),
        "ollama" => Ok(Box::new(OllamaProvider::new(config)?)),
        other => Err(Error::Validation(format!(
            "unknown embedding provider: {other}"
        ))),
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing a
/// BLOB of `vec.len() × 4` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]: reads 4-byte little-endian `f32` values
/// from the byte slice.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        let restored = blob_to_vec(&blob);
        assert_eq!(vec, restored);
    }

    #[tokio::test]
    async fn test_disabled_provider_errors() {
        let provider = DisabledProvider;
        match provider.embed_text("plastic waste").await {
            Err(Error::EmbeddingUnavailable(_)) => {}
            other => panic!("expected EmbeddingUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_dims_check() {
        assert!(check_dims(&[0.0; 4], 4).is_ok());
        assert!(matches!(
            check_dims(&[0.0; 3], 4),
            Err(Error::EmbeddingUnavailable(_))
        ));
    }

    #[test]
    fn test_create_provider_disabled() {
        let config = EmbeddingConfig::default();
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.model_name(), "disabled");
    }
}
