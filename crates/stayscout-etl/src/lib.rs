//! ETL pipeline for stayscout.
//!
//! Implements the one-shot CSV cleaning/loading step and the
//! incremental embedding/indexing pipeline: fetch a page of cleaned
//! listings past the watermark, synthesize embedding text, embed in
//! sub-batches, upsert vectors into the index, and advance the
//! watermark only once the whole page has landed.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod clean;
pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod pipeline;
pub mod text;

pub use config::Config;
pub use embed::{embed_all, EmbeddingClient, GeminiClient};
pub use error::{EtlError, EtlResult};
pub use index::{upsert_all, IndexPoint, QdrantClient, ScoredPoint, VectorIndex};
pub use pipeline::{Indexer, IndexerOpts, RunOutcome};
pub use text::embedding_text;
