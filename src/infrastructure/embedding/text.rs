use async_trait::async_trait;
use rig::client::{EmbeddingsClient, ProviderClient};
use rig::embeddings::EmbeddingModel;
use rig::providers::openai;
use tracing::instrument;

use crate::domain::{ports::EmbeddingService, DomainError, Embedding};
use crate::infrastructure::config::EmbeddingConfig;
use crate::infrastructure::llm::require_api_key;

pub struct TextEmbedding {
    model: String,
    dimension: usize,
}

impl TextEmbedding {
    pub fn new() -> Self {
        Self {
            model: "text-embedding-ada-002".to_string(),
            dimension: 1536,
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            model: config.model.clone(),
            dimension: config.dimension,
        }
    }

    fn check_dimension(&self, embedding: &Embedding) -> Result<(), DomainError> {
        if embedding.dimension() != self.dimension {
            return Err(DomainError::external(format!(
                "Model {} returned {} dimensions, expected {}",
                self.model,
                embedding.dimension(),
                self.dimension
            )));
        }
        Ok(())
    }
}

impl Default for TextEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

/// Embeds `texts` so that the i-th vector belongs to the i-th text.
///
/// Each request carries at most `M::MAX_DOCUMENTS` texts and the provider
/// answers a request in input order.
async fn embed_in_order<M: EmbeddingModel>(
    model: &M,
    texts: &[&str],
) -> Result<Vec<Embedding>, DomainError> {
    let mut embeddings = Vec::with_capacity(texts.len());

    for request in texts.chunks(M::MAX_DOCUMENTS.max(1)) {
        let response = model
            .embed_texts(request.iter().map(|t| t.to_string()).collect::<Vec<_>>())
            .await
            .map_err(|e| DomainError::external(e.to_string()))?;

        if response.len() != request.len() {
            return Err(DomainError::external(format!(
                "Embedding request returned {} vectors for {} texts",
                response.len(),
                request.len()
            )));
        }
        embeddings.extend(response.into_iter().map(|emb| Embedding::from(emb.vec)));
    }

    Ok(embeddings)
}

#[async_trait]
impl EmbeddingService for TextEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        let mut embeddings = self.embed_batch(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| DomainError::internal("No embedding returned"))
    }

    #[instrument(skip(self, texts), fields(model = %self.model, count = texts.len()))]
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        require_api_key()?;
        let client = openai::Client::from_env();
        let model = client.embedding_model(&self.model);

        let embeddings = embed_in_order(&model, texts).await?;
        for embedding in &embeddings {
            self.check_dimension(embedding)?;
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
