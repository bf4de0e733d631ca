//! In-memory vector index, exact (brute-force) cosine search.
//!
//! Suited to tests, demos, and small single-session indexes; nothing is
//! persisted.

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{IndexHit, VectorIndex, check_dimensions, cosine_similarity};
use crate::types::{Chunk, RagError};

pub struct InMemoryVectorIndex {
    dimensions: usize,
    entries: RwLock<Vec<(Chunk, Vec<f32>)>>,
}

impl InMemoryVectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn upsert(&self, entries: Vec<(Chunk, Vec<f32>)>) -> Result<(), RagError> {
        for (_, embedding) in &entries {
            check_dimensions(self.dimensions, embedding.len())?;
        }
        self.entries.write().extend(entries);
        Ok(())
    }

    async fn query(&self, embedding: &[f32], n: usize) -> Result<Vec<IndexHit>, RagError> {
        check_dimensions(self.dimensions, embedding.len())?;

        let entries = self.entries.read();
        let mut hits: Vec<IndexHit> = entries
            .iter()
            .map(|(chunk, stored)| IndexHit {
                chunk: chunk.clone(),
                score: cosine_similarity(embedding, stored),
                embedding: stored.clone(),
            })
            .collect();
        drop(entries);

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(n);
        Ok(hits)
    }

    async fn clear(&self) -> Result<(), RagError> {
        self.entries.write().clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.entries.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(ordinal: usize, text: &str) -> Chunk {
        Chunk::new("doc", ordinal, text)
    }

    #[tokio::test]
    async fn query_orders_by_similarity() {
        let index = InMemoryVectorIndex::new(2);
        index
            .upsert(vec![
                (chunk(0, "east"), vec![1.0, 0.0]),
                (chunk(1, "north"), vec![0.0, 1.0]),
                (chunk(2, "northeast"), vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], 3).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["east", "northeast", "north"]);
        assert!(hits[0].score > hits[1].score && hits[1].score > hits[2].score);
    }

    #[tokio::test]
    async fn empty_index_returns_no_hits() {
        let index = InMemoryVectorIndex::new(4);
        assert!(index.query(&[0.0; 4], 5).await.unwrap().is_empty());
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let index = InMemoryVectorIndex::new(3);
        let err = index
            .upsert(vec![(chunk(0, "bad"), vec![1.0, 2.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 3, actual: 2 }));

        let err = index.query(&[1.0], 1).await.unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let index = InMemoryVectorIndex::new(2);
        index
            .upsert(vec![(chunk(0, "a"), vec![1.0, 0.0])])
            .await
            .unwrap();
        index.clear().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
        assert!(index.query(&[1.0, 0.0], 1).await.unwrap().is_empty());
    }
}
