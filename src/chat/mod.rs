//! Chat collaborator interface.

pub mod cohere;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::prompt::AssembledPrompt;
use crate::types::RagError;

pub use cohere::CohereChat;

/// A hosted chat model the pipeline forwards assembled prompts to.
///
/// The response text is returned unmodified; retry and rate-limit policy
/// belongs to the implementation, not to callers of this trait.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, prompt: &AssembledPrompt) -> Result<String, RagError>;
}

/// Offline chat client for tests and demos: always answers with a canned
/// reply and records every prompt it was given.
pub struct MockChatClient {
    reply: String,
    prompts: Mutex<Vec<AssembledPrompt>>,
}

impl MockChatClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<AssembledPrompt> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, prompt: &AssembledPrompt) -> Result<String, RagError> {
        self.prompts.lock().push(prompt.clone());
        Ok(self.reply.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_records_prompts_and_replies() {
        let client = MockChatClient::new("forty-two");
        let prompt = AssembledPrompt {
            system: "sys".into(),
            user: "what is the answer?".into(),
        };

        let answer = client.complete(&prompt).await.unwrap();
        assert_eq!(answer, "forty-two");
        let seen = client.prompts();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].user, "what is the answer?");
    }
}
