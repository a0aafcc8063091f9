use std::sync::Arc;

use tracing::info;

use crate::application::{
    DocumentService, FaithfulnessEvaluator, IndexService, QueryEngine, QuerySettings,
    RelevancyEvaluator, VectorIndex, VectorStoreFactory,
};
use crate::domain::{
    ports::{DocumentLoader, EmbeddingService, LlmService, VectorStore},
    DomainError,
};
use crate::infrastructure::{
    AppConfig, FileLoader, InMemoryVectorStore, JsonIndexStorage, OpenAiLlm, TextEmbedding,
};

/// Everything one run needs, wired from a single [`AppConfig`].
pub struct Pipeline {
    config: Arc<AppConfig>,
    llm: Arc<dyn LlmService>,
    indexer: IndexService,
}

impl Pipeline {
    /// OpenAI-backed wiring used by the binaries.
    pub fn from_config(config: AppConfig) -> Self {
        let embedding = Arc::new(TextEmbedding::from_config(&config.config.embedding));
        let llm = Arc::new(OpenAiLlm::from_config(&config.config.llm));
        Self::with_services(config, embedding, llm, Arc::new(FileLoader::new()))
    }

    pub fn with_services(
        config: AppConfig,
        embedding: Arc<dyn EmbeddingService>,
        llm: Arc<dyn LlmService>,
        loader: Arc<dyn DocumentLoader>,
    ) -> Self {
        let rag_config = &config.config.rag;
        let documents = DocumentService::new(loader)
            .with_chunking(rag_config.chunk_size, rag_config.chunk_overlap);
        let new_store: VectorStoreFactory =
            Arc::new(|| Arc::new(InMemoryVectorStore::new()) as Arc<dyn VectorStore>);
        let indexer = IndexService::new(
            documents,
            embedding,
            new_store,
            Arc::new(JsonIndexStorage::new()),
        )
        .with_batch_size(config.config.embedding.batch_size)
        .with_corrupt_policy(config.config.pipeline.corrupt_index_policy);

        Self {
            config: Arc::new(config),
            llm,
            indexer,
        }
    }

    pub fn indexer(&self) -> &IndexService {
        &self.indexer
    }

    /// Loads or builds the index for the configured source and persist dir.
    pub async fn acquire_index(&self) -> Result<VectorIndex, DomainError> {
        let pipeline = &self.config.config.pipeline;
        let index = self
            .indexer
            .load_or_build(&pipeline.source, pipeline.persist_dir.as_deref())
            .await?;
        info!(
            origin = ?index.origin(),
            chunks = index.manifest().chunk_count,
            "index ready"
        );
        Ok(index)
    }

    pub fn query_engine(&self, index: &VectorIndex) -> QueryEngine {
        index.as_query_engine(self.llm.clone(), QuerySettings::from(self.config.as_ref()))
    }

    pub fn faithfulness_evaluator(&self) -> FaithfulnessEvaluator {
        FaithfulnessEvaluator::new(self.llm.clone())
            .with_template(self.config.prompts.evaluation.faithfulness.clone())
    }

    pub fn relevancy_evaluator(&self) -> RelevancyEvaluator {
        RelevancyEvaluator::new(self.llm.clone())
            .with_template(self.config.prompts.evaluation.relevancy.clone())
    }
}
