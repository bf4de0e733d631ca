//! Minimal retrieval-augmented-generation pipeline.
//!
//! ```text
//! SourceDescriptor ──► ingestion::loader ──► Document
//!                                              │
//!                        ingestion::normalize ─┤
//!                        ingestion::chunker  ──┴─► Chunk
//!                                                    │
//! embeddings::EmbeddingClient ──► vectors ──► stores::VectorIndex
//!                                                    │
//! question ──► retriever (MMR) ──► prompt::assemble ─┴─► chat::ChatClient ──► answer
//! ```
//!
//! [`pipeline::RagPipeline`] composes the stages into two operations:
//! `build(sources) -> IndexHandle` and `ask(&handle, question) -> answer`.
//! Embedding, chat, and vector-index collaborators are trait objects, so
//! hosted services and offline mocks plug in interchangeably.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ragline::chat::cohere::CohereChat;
//! use ragline::embeddings::cohere::CohereEmbeddings;
//! use ragline::ingestion::SourceDescriptor;
//! use ragline::pipeline::{IndexConfig, RagPipeline};
//!
//! # async fn run() -> Result<(), ragline::types::RagError> {
//! let http = reqwest::Client::new();
//! let api_key = std::env::var("COHERE_API_KEY").unwrap_or_default();
//! let pipeline = RagPipeline::builder()
//!     .embeddings(Arc::new(CohereEmbeddings::new(http.clone(), &api_key)?))
//!     .chat(Arc::new(CohereChat::new(http.clone(), &api_key)?))
//!     .http_client(http)
//!     .index(IndexConfig::Sqlite { dir: "./vectorstore".into() })
//!     .build();
//!
//! let handle = pipeline.build(&[SourceDescriptor::local("notes.pdf")]).await?;
//! let answer = pipeline.ask(&handle, "What are the key findings?").await?;
//! println!("{answer}");
//! handle.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod embeddings;
pub mod ingestion;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod stores;
pub mod types;

pub use chat::{ChatClient, MockChatClient};
pub use embeddings::{EmbeddingClient, MockEmbeddingClient};
pub use ingestion::{ChunkerConfig, DocumentFormat, SourceDescriptor, normalize};
pub use pipeline::{IndexConfig, IndexHandle, RagPipeline, RagPipelineBuilder};
pub use prompt::{AssembledPrompt, PromptTemplate};
pub use retriever::Retriever;
pub use stores::{IndexHit, VectorIndex};
pub use types::{ChatTurn, Chunk, Document, RagError, ScoredChunk};
