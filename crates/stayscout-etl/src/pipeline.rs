//! Incremental embedding/indexing pipeline.
//!
//! One invocation processes at most one page: load the watermark,
//! fetch the next page of cleaned listings past it, synthesize
//! embedding text, embed in sub-batches, upsert the vectors with
//! payload, and only then advance the watermark to the highest id in
//! the page. A failure at any stage aborts the run with the watermark
//! untouched, so the next invocation retries the same page; upserts
//! replace by id, which makes that reprocessing idempotent at the
//! index. The one exception is a checkpoint write failure after a
//! successful upsert: the side effects have landed but the watermark
//! has not moved, so processing is at-least-once, never lossy.
//!
//! Concurrent runs against the same checkpoint are not supported; the
//! caller must ensure single-flight scheduling.

use std::fmt;

use serde_json::Value;
use stayscout_core::{CheckpointFile, Database, Listing};

use crate::embed::{embed_all, EmbeddingClient};
use crate::error::{EtlError, EtlResult};
use crate::index::{upsert_all, IndexPoint, VectorIndex};
use crate::text::embedding_text;

/// Tunables for one pipeline run. Page, embedding, and upsert sizes
/// are independent of each other.
#[derive(Debug, Clone, Copy)]
pub struct IndexerOpts {
    pub page_size: u32,
    pub embed_batch_size: usize,
    pub upsert_batch_size: usize,
}

impl Default for IndexerOpts {
    fn default() -> Self {
        Self {
            page_size: 100,
            embed_batch_size: 100,
            upsert_batch_size: 250,
        }
    }
}

/// Result of a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A page was fully processed and the watermark advanced.
    Processed { rows: usize, last_seen_id: i64 },
    /// No rows remain beyond the watermark; nothing was changed.
    Drained,
}

/// The pipeline orchestrator.
///
/// Collaborators are injected rather than reached through globals so
/// tests can substitute an in-memory database and fake services.
pub struct Indexer<'a> {
    db: &'a Database,
    checkpoint: &'a CheckpointFile,
    embedder: &'a dyn EmbeddingClient,
    index: &'a dyn VectorIndex,
    opts: IndexerOpts,
}

impl fmt::Debug for Indexer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indexer")
            .field("checkpoint", &self.checkpoint.path())
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

impl<'a> Indexer<'a> {
    pub fn new(
        db: &'a Database,
        checkpoint: &'a CheckpointFile,
        embedder: &'a dyn EmbeddingClient,
        index: &'a dyn VectorIndex,
        opts: IndexerOpts,
    ) -> Self {
        Self {
            db,
            checkpoint,
            embedder,
            index,
            opts,
        }
    }

    /// Build the index payload: the full row plus the synthesized
    /// embedding text, so search results can show what was embedded.
    fn payload(listing: &Listing, text: &str) -> EtlResult<Value> {
        let mut value = serde_json::to_value(listing)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("embedding_text".to_string(), Value::String(text.to_string()));
        }
        Ok(value)
    }

    /// Process at most one page beyond the current watermark.
    pub async fn run_once(&self) -> EtlResult<RunOutcome> {
        let watermark = self.checkpoint.load();
        let page = self.db.fetch_page(watermark, self.opts.page_size)?;

        let Some(last) = page.last() else {
            log::info!(
                "No rows beyond watermark {:?}; nothing to do",
                watermark
            );
            return Ok(RunOutcome::Drained);
        };
        let first_id = page[0].listing_id;
        let last_id = last.listing_id;
        log::info!(
            "Fetched {} rows (ids {first_id}..={last_id}, watermark {:?})",
            page.len(),
            watermark
        );

        let texts: Vec<String> = page.iter().map(embedding_text).collect();

        let vectors = embed_all(self.embedder, &texts, self.opts.embed_batch_size)
            .await
            .map_err(|e| e.in_stage("embedding", first_id, last_id))?;

        let points = page
            .iter()
            .zip(texts.iter())
            .zip(vectors)
            .map(|((listing, text), vector)| {
                Ok(IndexPoint {
                    id: listing.listing_id,
                    vector,
                    payload: Self::payload(listing, text)?,
                })
            })
            .collect::<EtlResult<Vec<_>>>()?;

        upsert_all(self.index, &points, self.opts.upsert_batch_size)
            .await
            .map_err(|e| e.in_stage("upsert", first_id, last_id))?;

        self.checkpoint
            .save(last_id)
            .map_err(|e| EtlError::from(e).in_stage("checkpoint", first_id, last_id))?;

        log::info!("Processed {} rows; watermark advanced to {last_id}", page.len());
        Ok(RunOutcome::Processed {
            rows: page.len(),
            last_seen_id: last_id,
        })
    }

    /// Run page after page until the backlog is drained.
    /// Returns the total number of rows processed.
    pub async fn run_to_completion(&self) -> EtlResult<usize> {
        let mut total = 0;
        loop {
            match self.run_once().await? {
                RunOutcome::Processed { rows, .. } => total += rows,
                RunOutcome::Drained => return Ok(total),
            }
        }
    }
}
