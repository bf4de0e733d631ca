//! Cohere chat client (`/v1/chat`).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::ChatClient;
use crate::prompt::AssembledPrompt;
use crate::types::RagError;

const DEFAULT_MODEL: &str = "command-r-08-2024";
const DEFAULT_BASE_URL: &str = "https://api.cohere.com";

/// Chat completions via the Cohere REST API. The assembled system part maps
/// to the `preamble` field, the user part to `message`.
#[derive(Clone)]
pub struct CohereChat {
    client: Client,
    api_key: String,
    model: String,
    base_url: Url,
}

impl CohereChat {
    pub fn new(client: Client, api_key: impl Into<String>) -> Result<Self, RagError> {
        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|err| RagError::Chat(format!("invalid base url: {err}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url,
        })
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Points the client at a different host (used by tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    fn endpoint(&self) -> Result<Url, RagError> {
        self.base_url
            .join("/v1/chat")
            .map_err(|err| RagError::Chat(format!("invalid chat endpoint: {err}")))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    preamble: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    text: String,
}

#[async_trait]
impl ChatClient for CohereChat {
    async fn complete(&self, prompt: &AssembledPrompt) -> Result<String, RagError> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "chat completion");

        let response = self
            .client
            .post(self.endpoint()?)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                message: &prompt.user,
                preamble: &prompt.system,
            })
            .send()
            .await
            .map_err(|err| RagError::Chat(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Chat(format!(
                "chat request returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| RagError::Chat(format!("malformed chat response: {err}")))?;
        Ok(parsed.text)
    }
}
