//! Error taxonomy of the similarity engine.

use crate::store::BlobName;
use thiserror::Error;

/// Every failure the engine reports. The engine never retries; recovery is
/// left to the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A mutating operation was attempted before any successful rebuild.
    #[error("index has not been fitted, rebuild it first")]
    NotFitted,

    /// Rebuild was given no document with both an id and usable text.
    #[error("no usable documents to fit the vocabulary on")]
    EmptyCorpus,

    /// Missing document id or empty text.
    #[error("missing document id or empty text")]
    EmptyInput,

    /// An appended vector references a column outside the vocabulary.
    #[error("vector references column {found} but the vocabulary has {columns} columns")]
    DimensionMismatch { columns: usize, found: usize },

    /// Persisted blobs are partial, undecodable or mutually inconsistent.
    #[error("persisted index is inconsistent: {0}")]
    CorruptState(String),

    /// The underlying store failed to read or write a blob.
    #[error("storage failure on blob '{blob}': {source}")]
    StorageFailure {
        blob: BlobName,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
