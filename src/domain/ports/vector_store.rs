use crate::domain::{errors::DomainError, DocumentChunk, Embedding, SearchResult};
use async_trait::async_trait;

#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, chunk: &DocumentChunk, embedding: &Embedding)
        -> Result<(), DomainError>;
    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError>;
    async fn entries(&self) -> Result<Vec<(DocumentChunk, Embedding)>, DomainError>;
    async fn len(&self) -> Result<usize, DomainError>;

    async fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len().await? == 0)
    }
}
