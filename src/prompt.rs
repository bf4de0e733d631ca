//! Prompt assembly: retrieved context + fixed instruction + question.
//!
//! Assembly is deterministic string composition with no I/O and no
//! truncation. If a downstream model enforces a context limit, that policy
//! belongs to the chat collaborator; [`AssembledPrompt::len`] exposes the
//! assembled size so callers can enforce limits before sending.

use serde::{Deserialize, Serialize};

use crate::types::Chunk;

const CONTEXT_SLOT: &str = "{context}";
const QUESTION_SLOT: &str = "{question}";

/// Two-part template: a system instruction carrying a `{context}` slot and a
/// user part carrying a `{question}` slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            system: "You are a helpful chatbot that answers questions based on the \
                     provided documents.\nAnswer the questions using only the following \
                     context:\n{context}"
                .to_string(),
            user: "{question}".to_string(),
        }
    }
}

/// The rendered prompt, split by role the way chat APIs consume it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssembledPrompt {
    pub system: String,
    pub user: String,
}

impl AssembledPrompt {
    /// Total assembled length in characters, for caller-side limit checks.
    pub fn len(&self) -> usize {
        self.system.chars().count() + self.user.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.user.is_empty()
    }
}

/// Renders `template` with the retrieved chunks (in retrieval order) and the
/// question. An empty chunk list renders an empty context block; the question
/// is still asked.
pub fn assemble(template: &PromptTemplate, context: &[Chunk], question: &str) -> AssembledPrompt {
    let context_block = context
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    AssembledPrompt {
        system: template.system.replace(CONTEXT_SLOT, &context_block),
        user: template.user.replace(QUESTION_SLOT, question),
    }
}
