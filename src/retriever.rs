//! Diversity-aware retrieval over a vector index.
//!
//! Retrieval embeds the question, over-samples nearest candidates from the
//! index, then selects `k` of them by maximal marginal relevance so the
//! context handed to the prompt is relevant without being redundant.

use std::sync::Arc;

use tracing::debug;

use crate::embeddings::EmbeddingClient;
use crate::stores::{IndexHit, VectorIndex, cosine_similarity};
use crate::types::{RagError, ScoredChunk};

/// How many nearest candidates are fetched per requested result before
/// diversity re-ranking.
pub const OVERSAMPLE_FACTOR: usize = 4;

pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    embeddings: Arc<dyn EmbeddingClient>,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>, embeddings: Arc<dyn EmbeddingClient>) -> Self {
        Self { index, embeddings }
    }

    /// Retrieves up to `k` chunks for `question`.
    ///
    /// `diversity_lambda` is clamped to `[0, 1]`: `1.0` is pure relevance
    /// ranking, `0.0` pure diversity. Scores in the result are the original
    /// query relevances. An empty index yields an empty result.
    pub async fn retrieve(
        &self,
        question: &str,
        k: usize,
        diversity_lambda: f32,
    ) -> Result<Vec<ScoredChunk>, RagError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let lambda = diversity_lambda.clamp(0.0, 1.0);

        let query_embedding = self.embeddings.embed(question).await?;
        let candidates = self
            .index
            .query(&query_embedding, OVERSAMPLE_FACTOR * k)
            .await?;
        debug!(candidates = candidates.len(), k, lambda, "re-ranking candidates");
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        Ok(maximal_marginal_relevance(&candidates, k, lambda))
    }
}

/// Iteratively picks the candidate maximizing
/// `lambda * relevance - (1 - lambda) * max_similarity(candidate, selected)`.
///
/// Candidates arrive ordered by relevance; scanning them in that order with a
/// strictly-greater comparison breaks ties toward the higher original rank.
fn maximal_marginal_relevance(candidates: &[IndexHit], k: usize, lambda: f32) -> Vec<ScoredChunk> {
    let mut remaining: Vec<usize> = (0..candidates.len()).collect();
    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));

    while selected.len() < k && !remaining.is_empty() {
        let mut best_position = 0;
        let mut best_score = f32::NEG_INFINITY;

        for (position, &candidate_index) in remaining.iter().enumerate() {
            let candidate = &candidates[candidate_index];
            let redundancy = selected
                .iter()
                .map(|&chosen| {
                    cosine_similarity(&candidate.embedding, &candidates[chosen].embedding)
                })
                .fold(f32::NEG_INFINITY, f32::max);
            let redundancy = if selected.is_empty() { 0.0 } else { redundancy };

            let score = lambda * candidate.score - (1.0 - lambda) * redundancy;
            if score > best_score {
                best_score = score;
                best_position = position;
            }
        }

        selected.push(remaining.remove(best_position));
    }

    selected
        .into_iter()
        .map(|index| ScoredChunk {
            chunk: candidates[index].chunk.clone(),
            score: candidates[index].score,
        })
        .collect()
}
