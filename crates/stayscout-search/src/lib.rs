//! Semantic listing search for stayscout.
//!
//! Embeds a free-text query with the same model used at indexing time
//! and runs a similarity query against the vector index, turning the
//! raw scored points back into presentable listing hits.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

use std::fmt;

use serde_json::Value;
use stayscout_etl::{EmbeddingClient, EtlError, QdrantClient, ScoredPoint};
use thiserror::Error;

/// Errors that can occur while searching.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query text was empty or whitespace.
    #[error("query must not be empty")]
    EmptyQuery,

    /// The embedding service returned no vector for the query.
    #[error("embedding service returned no vector for the query")]
    NoQueryVector,

    /// An error propagated from the embedding or index client.
    #[error(transparent)]
    Etl(#[from] EtlError),
}

pub type SearchResult<T> = std::result::Result<T, SearchError>;

const SNIPPET_LEN: usize = 160;

/// One search hit, flattened from the index payload.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub rank: usize,
    pub listing_id: i64,
    pub score: f32,
    pub name: String,
    pub district: String,
    pub city: String,
    pub property_type: String,
    pub room_type: String,
    pub price: f64,
    /// A truncated view of the text that was embedded for this listing.
    pub snippet: String,
}

fn payload_str(payload: &Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Truncate at a char boundary and mark the cut.
fn snippet_of(text: &str) -> String {
    if text.chars().count() <= SNIPPET_LEN {
        return text.to_string();
    }
    let cut: String = text.chars().take(SNIPPET_LEN).collect();
    format!("{cut}…")
}

impl SearchHit {
    fn from_point(rank: usize, point: &ScoredPoint) -> Self {
        let payload = &point.payload;
        Self {
            rank,
            listing_id: point.id,
            score: point.score,
            name: payload_str(payload, "name"),
            district: payload_str(payload, "district"),
            city: payload_str(payload, "city"),
            property_type: payload_str(payload, "property_type"),
            room_type: payload_str(payload, "room_type"),
            price: payload
                .get("price")
                .and_then(Value::as_f64)
                .unwrap_or_default(),
            snippet: snippet_of(&payload_str(payload, "embedding_text")),
        }
    }
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}. {} (score {:.4}, id {})",
            self.rank, self.name, self.score, self.listing_id
        )?;
        writeln!(
            f,
            "   {} — {}, {} | {} | ${}",
            self.property_type, self.district, self.city, self.room_type, self.price
        )?;
        write!(f, "   {}", self.snippet)
    }
}

/// Embed `query` and return the `top_k` most similar listings.
pub async fn search(
    embedder: &dyn EmbeddingClient,
    index: &QdrantClient,
    query: &str,
    top_k: usize,
) -> SearchResult<Vec<SearchHit>> {
    if query.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let vectors = embedder.embed_batch(&[query.to_string()]).await?;
    let Some(vector) = vectors.first() else {
        return Err(SearchError::NoQueryVector);
    };

    let points = index.query(vector, top_k).await?;
    log::info!(
        "Query matched {} points in collection '{}'",
        points.len(),
        index.collection()
    );

    Ok(points
        .iter()
        .enumerate()
        .map(|(i, point)| SearchHit::from_point(i + 1, point))
        .collect())
}
