//! Pipeline orchestration: `build` an index from sources, `ask` it questions.
//!
//! `build` runs load → normalize → chunk → embed → index and hands back an
//! [`IndexHandle`] that exclusively owns the index and its backing storage.
//! `ask` runs retrieve → assemble → complete against a handle. The two are
//! explicit typed calls; there is no session singleton and no implicit
//! chaining.

use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::chat::ChatClient;
use crate::embeddings::EmbeddingClient;
use crate::ingestion::chunker::{self, ChunkerConfig};
use crate::ingestion::loader::{self, SourceDescriptor};
use crate::ingestion::normalize::normalize;
use crate::prompt::{self, PromptTemplate};
use crate::retriever::Retriever;
use crate::stores::{InMemoryVectorIndex, SqliteVectorIndex, VectorIndex};
use crate::types::{ChatTurn, Chunk, RagError};

/// Cohere caps embed batches at 96 texts; other providers tolerate it fine.
const EMBED_BATCH_SIZE: usize = 96;

/// Where a build places its vector index.
#[derive(Clone, Debug)]
pub enum IndexConfig {
    /// Brute-force index in process memory; nothing touches disk.
    InMemory,
    /// SQLite database inside `dir`. The directory is recreated on every
    /// build (rebuild, not append) and removed at teardown.
    Sqlite { dir: PathBuf },
}

/// Owns one built vector index and its backing storage.
///
/// The caller sequences `build` before `ask`; the handle itself never hands
/// its index to anyone else. Dropping the handle removes on-disk storage
/// best-effort; [`close`](IndexHandle::close) does so with error reporting.
pub struct IndexHandle {
    index: Arc<dyn VectorIndex>,
    storage: Option<StorageGuard>,
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl IndexHandle {
    /// The underlying index, for direct inspection (e.g. `count`).
    pub fn index(&self) -> Arc<dyn VectorIndex> {
        Arc::clone(&self.index)
    }

    /// Tears the index down and removes its backing directory.
    pub async fn close(self) -> Result<(), RagError> {
        let IndexHandle { index, storage } = self;
        // The sqlite connection must go before its directory does.
        drop(index);
        if let Some(mut guard) = storage {
            guard.release()?;
        }
        Ok(())
    }
}

/// Removes the index directory on drop unless explicitly released.
///
/// Guarantees storage cleanup on every exit path, including build failure.
#[derive(Debug)]
struct StorageGuard {
    dir: PathBuf,
    armed: bool,
}

impl StorageGuard {
    fn new(dir: PathBuf) -> Self {
        Self { dir, armed: true }
    }

    fn release(&mut self) -> Result<(), RagError> {
        self.armed = false;
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl Drop for StorageGuard {
    fn drop(&mut self) {
        if self.armed && self.dir.exists() {
            if let Err(err) = std::fs::remove_dir_all(&self.dir) {
                warn!(dir = %self.dir.display(), %err, "failed to remove index directory");
            }
        }
    }
}

/// The composed RAG pipeline. Construct via [`RagPipeline::builder`].
pub struct RagPipeline {
    embeddings: Arc<dyn EmbeddingClient>,
    chat: Arc<dyn ChatClient>,
    http: Client,
    chunker: ChunkerConfig,
    template: PromptTemplate,
    index_config: IndexConfig,
    top_k: usize,
    diversity_lambda: f32,
}

impl RagPipeline {
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Ingests `sources` into a fresh vector index.
    ///
    /// Fails fast on the first loader, chunker, embedding, or storage error;
    /// on failure no partial index or directory survives. Sources that load
    /// empty are skipped, and an all-empty build yields a valid empty index.
    pub async fn build(&self, sources: &[SourceDescriptor]) -> Result<IndexHandle, RagError> {
        self.chunker.validate().map_err(RagError::into_ingest)?;

        let (index, mut storage) = self.create_index().await.map_err(RagError::into_ingest)?;

        match self.ingest_into(&index, sources).await {
            Ok(chunk_count) => {
                info!(sources = sources.len(), chunk_count, "index build complete");
                Ok(IndexHandle { index, storage })
            }
            Err(err) => {
                if let Some(guard) = storage.as_mut() {
                    if let Err(cleanup) = guard.release() {
                        warn!(%cleanup, "failed to clean up after aborted build");
                    }
                }
                Err(err.into_ingest())
            }
        }
    }

    /// Answers `question` from the given index.
    ///
    /// An empty retrieval still sends the question with an empty context
    /// block; the chat model's response is returned unmodified.
    pub async fn ask(&self, handle: &IndexHandle, question: &str) -> Result<String, RagError> {
        Ok(self.ask_turn(handle, question).await?.answer)
    }

    /// Like [`ask`](Self::ask), but returns the full turn including the
    /// context chunks that grounded the answer.
    pub async fn ask_turn(
        &self,
        handle: &IndexHandle,
        question: &str,
    ) -> Result<ChatTurn, RagError> {
        let retriever = Retriever::new(handle.index(), Arc::clone(&self.embeddings));
        let retrieved = retriever
            .retrieve(question, self.top_k, self.diversity_lambda)
            .await
            .map_err(RagError::into_query)?;
        debug!(retrieved = retrieved.len(), "context retrieved");

        let context: Vec<Chunk> = retrieved.into_iter().map(|scored| scored.chunk).collect();
        let prompt = prompt::assemble(&self.template, &context, question);

        let answer = self
            .chat
            .complete(&prompt)
            .await
            .map_err(RagError::into_query)?;

        Ok(ChatTurn {
            question: question.to_string(),
            context,
            answer,
        })
    }

    async fn create_index(
        &self,
    ) -> Result<(Arc<dyn VectorIndex>, Option<StorageGuard>), RagError> {
        let dimensions = self.embeddings.dimensions();
        match &self.index_config {
            IndexConfig::InMemory => {
                Ok((Arc::new(InMemoryVectorIndex::new(dimensions)), None))
            }
            IndexConfig::Sqlite { dir } => {
                // Rebuild, not append: discard any previous index at this
                // identity before writing.
                if dir.exists() {
                    tokio::fs::remove_dir_all(dir).await?;
                }
                tokio::fs::create_dir_all(dir).await?;
                let guard = StorageGuard::new(dir.clone());
                let index = SqliteVectorIndex::open(dir.join("index.sqlite"), dimensions).await?;
                Ok((Arc::new(index), Some(guard)))
            }
        }
    }

    async fn ingest_into(
        &self,
        index: &Arc<dyn VectorIndex>,
        sources: &[SourceDescriptor],
    ) -> Result<usize, RagError> {
        let mut chunks: Vec<Chunk> = Vec::new();
        for source in sources {
            let documents = loader::load(&self.http, source).await?;
            debug!(source = %source.id(), documents = documents.len(), "source loaded");
            for document in documents {
                let text = normalize(&document.raw_text);
                chunks.extend(chunker::split(&self.chunker, &document.source_id, &text)?);
            }
        }

        let total = chunks.len();
        for batch in chunks.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = self.embeddings.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "expected {} vectors, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            let entries: Vec<(Chunk, Vec<f32>)> =
                batch.iter().cloned().zip(vectors).collect();
            index.upsert(entries).await?;
        }

        Ok(total)
    }
}

/// Builder for [`RagPipeline`]. Embedding and chat clients are required.
#[derive(Default)]
pub struct RagPipelineBuilder {
    embeddings: Option<Arc<dyn EmbeddingClient>>,
    chat: Option<Arc<dyn ChatClient>>,
    http: Option<Client>,
    chunker: Option<ChunkerConfig>,
    template: Option<PromptTemplate>,
    index_config: Option<IndexConfig>,
    top_k: Option<usize>,
    diversity_lambda: Option<f32>,
}

impl RagPipelineBuilder {
    #[must_use]
    pub fn embeddings(mut self, embeddings: Arc<dyn EmbeddingClient>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    #[must_use]
    pub fn chat(mut self, chat: Arc<dyn ChatClient>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// HTTP client used by loader back-ends. Defaults to a stock client.
    #[must_use]
    pub fn http_client(mut self, client: Client) -> Self {
        self.http = Some(client);
        self
    }

    #[must_use]
    pub fn chunker(mut self, config: ChunkerConfig) -> Self {
        self.chunker = Some(config);
        self
    }

    #[must_use]
    pub fn template(mut self, template: PromptTemplate) -> Self {
        self.template = Some(template);
        self
    }

    #[must_use]
    pub fn index(mut self, config: IndexConfig) -> Self {
        self.index_config = Some(config);
        self
    }

    /// Number of context chunks per question. Defaults to 3.
    #[must_use]
    pub fn top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// MMR relevance/diversity balance in `[0, 1]`. Defaults to 0.3.
    #[must_use]
    pub fn diversity_lambda(mut self, lambda: f32) -> Self {
        self.diversity_lambda = Some(lambda);
        self
    }

    /// Builds the pipeline.
    ///
    /// # Panics
    ///
    /// Panics if the embedding or chat client was not set.
    pub fn build(self) -> RagPipeline {
        RagPipeline {
            embeddings: self
                .embeddings
                .expect("RagPipelineBuilder requires an embedding client"),
            chat: self.chat.expect("RagPipelineBuilder requires a chat client"),
            http: self.http.unwrap_or_default(),
            chunker: self.chunker.unwrap_or_default(),
            template: self.template.unwrap_or_default(),
            index_config: self.index_config.unwrap_or(IndexConfig::InMemory),
            top_k: self.top_k.unwrap_or(3),
            diversity_lambda: self.diversity_lambda.unwrap_or(0.3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn storage_guard_removes_directory_on_drop() {
        let parent = tempdir().unwrap();
        let dir = parent.path().join("index");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("index.sqlite"), b"stub").unwrap();

        drop(StorageGuard::new(dir.clone()));
        assert!(!dir.exists());
    }

    #[test]
    fn released_guard_leaves_nothing_behind_and_disarms() {
        let parent = tempdir().unwrap();
        let dir = parent.path().join("index");
        std::fs::create_dir_all(&dir).unwrap();

        let mut guard = StorageGuard::new(dir.clone());
        guard.release().unwrap();
        assert!(!dir.exists());
        // A second drop after release must not error or recreate anything.
        drop(guard);
        assert!(!dir.exists());
    }
}
