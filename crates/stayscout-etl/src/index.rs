//! Vector index client and batched upserts.
//!
//! The index is reached through the [`VectorIndex`] trait so the
//! pipeline can be tested against a fake. The concrete client talks
//! to Qdrant's REST API with small serializable wire-shape structs
//! rather than pulling in an SDK crate; see the Qdrant points and
//! collections endpoints for the shapes involved.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EtlError, EtlResult};

/// The unit stored in the vector index: the listing id, its embedding
/// vector, and the full row (plus embedding text) as payload.
/// Upserting an existing id replaces the point entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPoint {
    pub id: i64,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// A similarity-search hit returned by the index.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoredPoint {
    pub id: i64,
    pub score: f32,
    #[serde(default)]
    pub payload: Value,
}

/// An upsert-capable vector index collection.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Make sure the target collection exists with the given
    /// dimensionality. Must be idempotent: if the collection already
    /// exists this is a no-op, and a dimensionality mismatch against
    /// an existing collection is a fatal configuration error surfaced
    /// by the service, never silently handled.
    async fn ensure_collection(&self, vector_size: usize) -> EtlResult<()>;

    /// Upsert one chunk of points. All-or-nothing from the caller's
    /// perspective.
    async fn upsert(&self, points: &[IndexPoint]) -> EtlResult<()>;
}

/// Upsert all points, chunked at `batch_size`.
///
/// Provisions the collection first, using the dimensionality of the
/// first vector in the batch. The upsert batch size is independent of
/// the embedding sub-batch size. Empty input is a no-op.
pub async fn upsert_all(
    index: &dyn VectorIndex,
    points: &[IndexPoint],
    batch_size: usize,
) -> EtlResult<()> {
    let Some(first) = points.first() else {
        return Ok(());
    };
    index.ensure_collection(first.vector.len()).await?;

    let total = points.len();
    let mut done = 0usize;
    for chunk in points.chunks(batch_size.max(1)) {
        index.upsert(chunk).await?;
        done += chunk.len();
        log::debug!("Upserted {done} / {total} points");
    }
    Ok(())
}

/// Qdrant REST API client.
#[derive(Debug, Clone)]
pub struct QdrantClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

#[derive(Debug, Deserialize)]
struct CollectionsResponse {
    result: CollectionsResult,
}

#[derive(Debug, Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Serialize)]
struct CreateCollectionRequest {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: &'static str,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    points: &'a [IndexPoint],
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    points: Vec<ScoredPoint>,
}

impl QdrantClient {
    /// Create a new Qdrant client for one collection.
    ///
    /// # Errors
    /// Returns an error if the base URL is not http(s) or the HTTP
    /// client cannot be created.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        collection: impl Into<String>,
    ) -> EtlResult<Self> {
        let base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(EtlError::Config(format!(
                "Qdrant URL must be http(s), got {base_url}"
            )));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("stayscout/0.1.0 (https://github.com/oxur/stayscout)")
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            collection: collection.into(),
        })
    }

    /// The collection this client targets.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn check(
        response: reqwest::Response,
        operation: &'static str,
    ) -> EtlResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        Err(EtlError::Index {
            operation,
            message: format!("{status}: {body}"),
        })
    }

    /// List the names of existing collections.
    pub async fn list_collections(&self) -> EtlResult<Vec<String>> {
        let url = format!("{}/collections", self.base_url);
        let response = self.request(self.http.get(&url)).send().await?;
        let parsed: CollectionsResponse = Self::check(response, "list collections")
            .await?
            .json()
            .await?;
        Ok(parsed
            .result
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    /// Create the target collection with cosine distance.
    pub async fn create_collection(&self, vector_size: usize) -> EtlResult<()> {
        let url = format!("{}/collections/{}", self.base_url, self.collection);
        let body = CreateCollectionRequest {
            vectors: VectorParams {
                size: vector_size,
                distance: "Cosine",
            },
        };
        let response = self.request(self.http.put(&url)).json(&body).send().await?;
        Self::check(response, "create collection").await?;
        log::info!(
            "Created collection '{}' with vector size {vector_size}",
            self.collection
        );
        Ok(())
    }

    /// Similarity-search the collection with a query vector.
    pub async fn query(&self, vector: &[f32], limit: usize) -> EtlResult<Vec<ScoredPoint>> {
        let url = format!(
            "{}/collections/{}/points/query",
            self.base_url, self.collection
        );
        let body = QueryRequest {
            query: vector,
            limit,
            with_payload: true,
        };
        let response = self
            .request(self.http.post(&url))
            .json(&body)
            .send()
            .await?;
        let parsed: QueryResponse = Self::check(response, "query").await?.json().await?;
        Ok(parsed.result.points)
    }
}

#[async_trait]
impl VectorIndex for QdrantClient {
    async fn ensure_collection(&self, vector_size: usize) -> EtlResult<()> {
        let existing = self.list_collections().await?;
        if existing.iter().any(|name| *name == self.collection) {
            log::debug!(
                "Collection '{}' already exists, skipping creation",
                self.collection
            );
            return Ok(());
        }
        self.create_collection(vector_size).await
    }

    async fn upsert(&self, points: &[IndexPoint]) -> EtlResult<()> {
        let url = format!(
            "{}/collections/{}/points?wait=true",
            self.base_url, self.collection
        );
        let body = UpsertRequest { points };
        let response = self.request(self.http.put(&url)).json(&body).send().await?;
        Self::check(response, "upsert").await?;
        Ok(())
    }
}
