//! Embedding service client and sub-batching.
//!
//! The pipeline talks to the embedding service through the
//! [`EmbeddingClient`] trait so tests can substitute a fake.
//! [`embed_all`] handles splitting a page of texts into bounded
//! sub-batches; the concrete client sends one request per sub-batch.
//! Retry/backoff is deliberately not implemented here: a failed run
//! leaves the watermark untouched and the next invocation retries the
//! same page.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, EtlResult};

/// An ordered batch embedding service.
///
/// Implementations must return exactly one vector per input text, in
/// input order, or fail the whole call.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single sub-batch of texts.
    async fn embed_batch(&self, texts: &[String]) -> EtlResult<Vec<Vec<f32>>>;
}

/// Embed all texts, splitting into sub-batches of `batch_size`.
///
/// Results are concatenated in input order: `result[i]` is the vector
/// for `texts[i]` regardless of how the texts were partitioned. Any
/// sub-batch failure aborts the whole call with no partial result.
pub async fn embed_all(
    client: &dyn EmbeddingClient,
    texts: &[String],
    batch_size: usize,
) -> EtlResult<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
        let batch = client.embed_batch(chunk).await?;
        if batch.len() != chunk.len() {
            return Err(EtlError::EmbedCount {
                sent: chunk.len(),
                received: batch.len(),
            });
        }
        vectors.extend(batch);
        log::debug!("Embedded {} / {} texts", vectors.len(), texts.len());
    }
    Ok(vectors)
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini embedding API client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

impl GeminiClient {
    /// Create a new Gemini embedding client.
    ///
    /// # Errors
    /// Returns an error if the API key is empty or the HTTP client
    /// cannot be created.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> EtlResult<Self> {
        Self::with_base_url(api_key, model, GEMINI_BASE_URL)
    }

    /// Create a client against a custom base URL (for tests/proxies).
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> EtlResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(EtlError::Config("missing Gemini API key".to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("stayscout/0.1.0 (https://github.com/oxur/stayscout)")
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingClient for GeminiClient {
    async fn embed_batch(&self, texts: &[String]) -> EtlResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/models/{}:batchEmbedContents?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|text| EmbedContentRequest {
                    model: format!("models/{}", self.model),
                    content: Content {
                        parts: vec![Part { text }],
                    },
                })
                .collect(),
        };

        let response = self.http.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EtlError::Embed {
                message: format!("batchEmbedContents returned {status}: {body}"),
            });
        }

        let parsed: BatchEmbedResponse = response.json().await?;
        if parsed.embeddings.len() != texts.len() {
            return Err(EtlError::EmbedCount {
                sent: texts.len(),
                received: parsed.embeddings.len(),
            });
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }
}
