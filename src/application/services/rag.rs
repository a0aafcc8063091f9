use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    ports::{EmbeddingService, VectorStore},
    DocumentChunk, DomainError, SearchResult,
};

pub struct RagService {
    embedding: Arc<dyn EmbeddingService>,
    vector_store: Arc<dyn VectorStore>,
    batch_size: usize,
}

impl RagService {
    pub fn new(embedding: Arc<dyn EmbeddingService>, vector_store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedding,
            vector_store,
            batch_size: 64,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStore> {
        &self.vector_store
    }

    #[instrument(skip(self))]
    pub async fn retrieve_top_k(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        if top_k == 0 || self.vector_store.is_empty().await? {
            return Ok(Vec::new());
        }
        let embedding = self.embedding.embed(query).await?;
        self.vector_store.search(&embedding, top_k).await
    }

    #[instrument(skip(self, chunks), fields(count = chunks.len()))]
    pub async fn index_chunks(&self, chunks: &[DocumentChunk]) -> Result<(), DomainError> {
        if chunks.is_empty() {
            return Ok(());
        }

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.content.as_str()).collect();
            let embeddings = self.embedding.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(DomainError::internal(format!(
                    "Embedding count mismatch: expected {}, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            for (chunk, embedding) in batch.iter().zip(embeddings.iter()) {
                self.vector_store.upsert(chunk, embedding).await?;
            }
        }

        Ok(())
    }
}
