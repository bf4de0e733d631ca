//! Embedding collaborator interface.
//!
//! The pipeline only needs two operations from an embedding provider: embed a
//! batch of chunk texts and embed a single query. Providers are trait objects
//! so the pipeline, stores, and tests can share one `Arc<dyn EmbeddingClient>`.

pub mod cohere;

use async_trait::async_trait;

use crate::types::RagError;

pub use cohere::CohereEmbeddings;

/// Converts text into fixed-dimension vectors.
///
/// An index is bound to one embedding model for its lifetime; `dimensions`
/// lets callers enforce that before any vector reaches storage.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Output dimensionality `d`, fixed per model.
    fn dimensions(&self) -> usize;

    /// Embeds a batch of texts, one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embeds a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("provider returned no vectors".into()))
    }
}

/// Deterministic offline embedder for tests and demos.
///
/// Hashed bag-of-words: each lowercased alphanumeric token bumps one
/// dimension, then the vector is L2-normalized so cosine similarity behaves.
/// Identical text always produces identical vectors.
#[derive(Clone, Debug)]
pub struct MockEmbeddingClient {
    dimensions: usize,
}

impl MockEmbeddingClient {
    pub fn new() -> Self {
        Self { dimensions: 64 }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let slot = fnv1a(&token.to_lowercase()) as usize % self.dimensions;
            vector[slot] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbeddingClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

/// FNV-1a, stable across platforms and releases (std hashers are not).
fn fnv1a(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embeddings_are_deterministic() {
        let client = MockEmbeddingClient::new();
        let inputs = vec![
            "hello world".to_string(),
            "goodbye world".to_string(),
            "hello world".to_string(),
        ];

        let first = client.embed_batch(&inputs).await.unwrap();
        let second = client.embed_batch(&inputs).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], first[2], "identical text, identical vector");
        assert_ne!(first[0], first[1], "different text, different vector");
    }

    #[tokio::test]
    async fn vectors_are_unit_length() {
        let client = MockEmbeddingClient::with_dimensions(32);
        let vector = client.embed("some sample sentence").await.unwrap();
        assert_eq!(vector.len(), 32);
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let client = MockEmbeddingClient::new();
        let vector = client.embed("").await.unwrap();
        assert!(vector.iter().all(|v| *v == 0.0));
    }
}
