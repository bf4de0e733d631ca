//! Vector index backends.
//!
//! [`VectorIndex`] is the narrow interface the pipeline consumes from a
//! vector database: store `(chunk, embedding)` pairs, answer nearest-neighbor
//! queries, and wipe everything on rebuild. Two backends are provided:
//!
//! ```text
//!                  ┌──────────────────┐
//!                  │ VectorIndex trait│
//!                  └────────┬─────────┘
//!              ┌────────────┴────────────┐
//!              ▼                         ▼
//!      ┌───────────────┐        ┌───────────────┐
//!      │   in-memory   │        │    SQLite     │
//!      │ (tests/demos) │        │  sqlite-vec   │
//!      └───────────────┘        └───────────────┘
//! ```
//!
//! Each index is bound to one embedding dimensionality for its lifetime;
//! vectors of any other size are rejected with
//! [`RagError::DimensionMismatch`](crate::types::RagError::DimensionMismatch).

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::types::{Chunk, RagError};

pub use memory::InMemoryVectorIndex;
pub use sqlite::SqliteVectorIndex;

/// One nearest-neighbor hit: the chunk, its cosine similarity to the query,
/// and the stored embedding (the retriever needs it for diversity scoring).
#[derive(Clone, Debug)]
pub struct IndexHit {
    pub chunk: Chunk,
    pub score: f32,
    pub embedding: Vec<f32>,
}

/// Minimal vector-database interface consumed by the pipeline.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The fixed embedding dimensionality of this index.
    fn dimensions(&self) -> usize;

    /// Stores `(chunk, embedding)` pairs. Vectors never change once written.
    async fn upsert(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<(), RagError>;

    /// Returns up to `n` hits ordered by descending cosine similarity.
    /// An empty index yields an empty vector, never an error.
    async fn query(&self, embedding: &[f32], n: usize) -> Result<Vec<IndexHit>, RagError>;

    /// Removes every stored entry.
    async fn clear(&self) -> Result<(), RagError>;

    /// Number of stored entries.
    async fn count(&self) -> Result<usize, RagError>;
}

/// Cosine similarity in `[-1, 1]`; zero when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

pub(crate) fn check_dimensions(expected: usize, actual: usize) -> Result<(), RagError> {
    if expected != actual {
        return Err(RagError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
