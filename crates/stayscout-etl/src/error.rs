//! Error types for the ETL pipeline.

use thiserror::Error;

/// Errors that can occur while cleaning, embedding, or indexing.
#[derive(Debug, Error)]
pub enum EtlError {
    /// The embedding service rejected a request or returned garbage.
    #[error("embedding service error: {message}")]
    Embed { message: String },

    /// The embedding service returned the wrong number of vectors for
    /// a sub-batch. Order can no longer be trusted, so the whole call
    /// is aborted.
    #[error("embedding count mismatch: sent {sent} texts, received {received} vectors")]
    EmbedCount { sent: usize, received: usize },

    /// The vector index service failed an operation.
    #[error("vector index error during {operation}: {message}")]
    Index {
        operation: &'static str,
        message: String,
    },

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// An error propagated from the core layer (database, checkpoint I/O).
    #[error("storage error: {0}")]
    Core(#[from] stayscout_core::Error),

    /// A row could not be serialized into an index payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The raw CSV could not be read or parsed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid or incomplete configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A pipeline stage failed; carries the stage name and the id
    /// bounds of the page being processed so a failed run can be
    /// diagnosed and safely retried.
    #[error("{stage} failed for page {first_id}..={last_id}: {source}")]
    Stage {
        stage: &'static str,
        first_id: i64,
        last_id: i64,
        #[source]
        source: Box<EtlError>,
    },
}

impl EtlError {
    /// Wrap this error with pipeline stage context.
    #[must_use]
    pub fn in_stage(self, stage: &'static str, first_id: i64, last_id: i64) -> Self {
        Self::Stage {
            stage,
            first_id,
            last_id,
            source: Box::new(self),
        }
    }

    /// Returns `true` when the error is transient and the same page
    /// may succeed on the next invocation. Configuration and data
    /// errors are not transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Embed { .. } | Self::Index { .. } | Self::Request(_) => true,
            Self::Stage { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// Convenience alias for ETL results.
pub type EtlResult<T> = std::result::Result<T, EtlError>;
