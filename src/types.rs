//! Core data model and error taxonomy shared across the pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw text record produced by a loader back-end.
///
/// Immutable once created; one source may yield several documents (e.g. one
/// per PDF page).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identifies where the text came from (path, URL, `path#page=N`, ...).
    pub source_id: String,
    /// The text as the loader read it, before normalization.
    pub raw_text: String,
}

impl Document {
    pub fn new(source_id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// A bounded-size span of normalized source text, the unit of embedding and
/// retrieval.
///
/// `ordinal` is the stable insertion order of the chunk within its document.
/// Chunk text stays within the configured maximum except when a single
/// separator-delimited segment is already larger; such a segment passes
/// through whole rather than being truncated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub source_id: String,
    pub ordinal: usize,
    pub text: String,
}

impl Chunk {
    pub fn new(source_id: impl Into<String>, ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ordinal,
            text: text.into(),
        }
    }
}

/// A retrieved chunk paired with its relevance score for the query.
///
/// Scores are cosine similarities in `[-1, 1]`; a retrieval result is ordered
/// by the retriever's selection policy, most relevant first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// One question/answer exchange, together with the context that grounded it.
///
/// Ephemeral: produced by [`ask_turn`](crate::pipeline::RagPipeline::ask_turn)
/// and never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatTurn {
    pub question: String,
    pub context: Vec<Chunk>,
    pub answer: String,
}

/// Unified error type for the whole pipeline.
///
/// Build-phase failures surface as [`RagError::Ingest`] and ask-phase failures
/// as [`RagError::Query`], each preserving the underlying cause as `source()`.
/// The inner variants identify which collaborator or stage failed.
#[derive(Debug, Error)]
pub enum RagError {
    /// A source could not be read or reached.
    #[error("failed to load '{source_id}': {reason}")]
    Load { source_id: String, reason: String },

    /// The source format is not in the supported set.
    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),

    /// Chunker configuration is unusable (`overlap >= max_chunk_size`, or a
    /// zero maximum / empty separator).
    #[error(
        "invalid chunk config: overlap {overlap} must be smaller than max chunk size {max_chunk_size}"
    )]
    InvalidChunkConfig { max_chunk_size: usize, overlap: usize },

    /// The embedding service rejected or failed a request.
    #[error("embedding service error: {0}")]
    Embedding(String),

    /// The chat service rejected or failed a request.
    #[error("chat service error: {0}")]
    Chat(String),

    /// The vector index backend failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A vector of the wrong dimensionality reached an index. Each index is
    /// bound to exactly one embedding model for its lifetime.
    #[error("embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Wraps any failure during `build`; no partial index survives.
    #[error("ingest failed: {0}")]
    Ingest(#[source] Box<RagError>),

    /// Wraps any failure during `ask`.
    #[error("query failed: {0}")]
    Query(#[source] Box<RagError>),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Wraps a build-phase error, avoiding double wrapping.
    pub(crate) fn into_ingest(self) -> RagError {
        match self {
            RagError::Ingest(_) => self,
            other => RagError::Ingest(Box::new(other)),
        }
    }

    /// Wraps an ask-phase error, avoiding double wrapping.
    pub(crate) fn into_query(self) -> RagError {
        match self {
            RagError::Query(_) => self,
            other => RagError::Query(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn ingest_wrapping_is_idempotent() {
        let inner = RagError::Embedding("boom".into());
        let wrapped = inner.into_ingest().into_ingest();
        match wrapped {
            RagError::Ingest(cause) => assert!(matches!(*cause, RagError::Embedding(_))),
            other => panic!("expected Ingest, got {other:?}"),
        }
    }

    #[test]
    fn query_error_preserves_source() {
        let err = RagError::Chat("rate limited".into()).into_query();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("chat service error"));
    }
}
