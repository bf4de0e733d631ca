//! Cohere embedding client (`/v1/embed`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::EmbeddingClient;
use crate::types::RagError;

/// Dimensionality of the `embed-english-v3.0` family.
const EMBED_V3_DIMENSIONS: usize = 1024;

const DEFAULT_MODEL: &str = "embed-english-v3.0";
const DEFAULT_BASE_URL: &str = "https://api.cohere.com";

/// Embeddings via the Cohere REST API.
#[derive(Clone)]
pub struct CohereEmbeddings {
    client: Client,
    api_key: String,
    model: String,
    base_url: Url,
    dimensions: usize,
    input_type: &'static str,
}

impl CohereEmbeddings {
    /// Client for the default `embed-english-v3.0` model.
    pub fn new(client: Client, api_key: impl Into<String>) -> Result<Self, RagError> {
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|err| RagError::Embedding(format!("invalid base url: {err}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url,
            dimensions: EMBED_V3_DIMENSIONS,
            input_type: "search_document",
        })
    }

    /// Overrides the model name and its dimensionality.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Points the client at a different host (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Embeds as `search_query` rather than `search_document`.
    #[must_use]
    pub fn for_queries(mut self) -> Self {
        self.input_type = "search_query";
        self
    }

    fn endpoint(&self) -> Result<Url, RagError> {
        self.base_url
            .join("/v1/embed")
            .map_err(|err| RagError::Embedding(format!("invalid embed endpoint: {err}")))
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    texts: &'a [String],
    input_type: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl EmbeddingClient for CohereEmbeddings {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), model = %self.model, "embedding batch");

        let response = self
            .client
            .post(self.endpoint()?)
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest {
                model: &self.model,
                texts,
                input_type: self.input_type,
            })
            .send()
            .await
            .map_err(|err| RagError::Embedding(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "embed request returned {status}: {body}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|err| RagError::Embedding(format!("malformed embed response: {err}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        for vector in &parsed.embeddings {
            if vector.len() != self.dimensions {
                return Err(RagError::Embedding(format!(
                    "model returned {}-dimensional vector, expected {}",
                    vector.len(),
                    self.dimensions
                )));
            }
        }

        Ok(parsed.embeddings)
    }
}
