use std::path::Path;
use std::sync::Arc;
use tracing::instrument;

use crate::domain::{
    chunk_content, ports::DocumentLoader, ChunkMetadata, Document, DocumentChunk, DomainError,
};

pub struct DocumentService {
    loader: Arc<dyn DocumentLoader>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentService {
    pub fn new(loader: Arc<dyn DocumentLoader>) -> Self {
        Self {
            loader,
            chunk_size: 4000,
            chunk_overlap: 80,
        }
    }

    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn load_chunks(
        &self,
        path: &Path,
    ) -> Result<(Document, Vec<DocumentChunk>), DomainError> {
        let doc = self.loader.load(path).await?;
        let source = path.display().to_string();

        let chunks: Vec<DocumentChunk> =
            chunk_content(doc.id, &doc.text, self.chunk_size, self.chunk_overlap)
                .into_iter()
                .map(|chunk| {
                    chunk.with_metadata(ChunkMetadata {
                        source: Some(source.clone()),
                        ..Default::default()
                    })
                })
                .collect();

        tracing::debug!(count = chunks.len(), "document chunked");
        Ok((doc, chunks))
    }
}
