use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::{DocumentService, QueryEngine, QuerySettings, RagService};
use crate::domain::{
    ports::{EmbeddingService, IndexStorage, LlmService, VectorStore},
    DomainError, IndexManifest, IndexProbe, IndexSnapshot,
};

/// Creates the empty store each new index is filled into.
pub type VectorStoreFactory = Arc<dyn Fn() -> Arc<dyn VectorStore> + Send + Sync>;

/// What to do when a persisted index exists but cannot be deserialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptIndexPolicy {
    /// Log the corruption and rebuild from the source document.
    #[default]
    Rebuild,
    /// Return the `CorruptIndex` error to the caller.
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    Loaded,
    Built,
}

/// A populated vector store ready to answer queries. Each index owns its
/// store, so later builds on the same service never change its contents.
pub struct VectorIndex {
    rag: Arc<RagService>,
    manifest: IndexManifest,
    origin: IndexOrigin,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("manifest", &self.manifest)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn origin(&self) -> IndexOrigin {
        self.origin
    }

    pub fn as_query_engine(
        &self,
        llm: Arc<dyn LlmService>,
        settings: QuerySettings,
    ) -> QueryEngine {
        QueryEngine::new(self.rag.clone(), llm, settings)
    }
}

pub struct IndexService {
    documents: DocumentService,
    embedding: Arc<dyn EmbeddingService>,
    new_store: VectorStoreFactory,
    storage: Arc<dyn IndexStorage>,
    batch_size: usize,
    corrupt_policy: CorruptIndexPolicy,
}

impl IndexService {
    pub fn new(
        documents: DocumentService,
        embedding: Arc<dyn EmbeddingService>,
        new_store: VectorStoreFactory,
        storage: Arc<dyn IndexStorage>,
    ) -> Self {
        Self {
            documents,
            embedding,
            new_store,
            storage,
            batch_size: 64,
            corrupt_policy: CorruptIndexPolicy::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_corrupt_policy(mut self, policy: CorruptIndexPolicy) -> Self {
        self.corrupt_policy = policy;
        self
    }

    /// Reuses the index persisted under `persist_dir` when it is present and
    /// compatible; otherwise builds from `source` and persists the result.
    /// Without `persist_dir` the index is always built and kept in memory only.
    #[instrument(skip(self, source), fields(source = %source.display()))]
    pub async fn load_or_build(
        &self,
        source: &Path,
        persist_dir: Option<&Path>,
    ) -> Result<VectorIndex, DomainError> {
        let Some(dir) = persist_dir else {
            return self.build(source).await;
        };

        match self.storage.probe(dir)? {
            IndexProbe::Absent => {
                info!(dir = %dir.display(), "no persisted index, building");
            }
            IndexProbe::Present => match self.load(dir).await {
                Ok(index) => return Ok(index),
                Err(e @ DomainError::IncompatibleIndex { .. }) => {
                    warn!(error = %e, "persisted index is incompatible, rebuilding");
                }
                Err(e @ DomainError::CorruptIndex { .. }) => match self.corrupt_policy {
                    CorruptIndexPolicy::Rebuild => {
                        warn!(error = %e, "persisted index is corrupt, rebuilding");
                    }
                    CorruptIndexPolicy::Fail => return Err(e),
                },
                Err(e) => return Err(e),
            },
        }

        let index = self.build(source).await?;
        self.persist(&index, dir).await?;
        Ok(index)
    }

    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    pub async fn load(&self, dir: &Path) -> Result<VectorIndex, DomainError> {
        let IndexSnapshot { manifest, entries } = self.storage.load(dir).await?;

        let embedding = &self.embedding;
        if manifest.embedding_model != embedding.model_name() {
            return Err(DomainError::incompatible(
                dir,
                format!(
                    "embedding model {} does not match configured {}",
                    manifest.embedding_model,
                    embedding.model_name()
                ),
            ));
        }
        if manifest.dimension != embedding.dimension() {
            return Err(DomainError::incompatible(
                dir,
                format!(
                    "dimension {} does not match configured {}",
                    manifest.dimension,
                    embedding.dimension()
                ),
            ));
        }
        if let Some((chunk, _)) = entries
            .iter()
            .find(|(_, e)| e.dimension() != manifest.dimension)
        {
            return Err(DomainError::corrupt(
                dir,
                format!("vector for chunk {} has the wrong dimension", chunk.id),
            ));
        }

        let rag = self.new_rag();
        for (chunk, embedding) in &entries {
            rag.vector_store().upsert(chunk, embedding).await?;
        }

        info!(count = entries.len(), "loaded persisted index");
        Ok(VectorIndex {
            rag,
            manifest,
            origin: IndexOrigin::Loaded,
        })
    }

    #[instrument(skip(self, source), fields(source = %source.display()))]
    pub async fn build(&self, source: &Path) -> Result<VectorIndex, DomainError> {
        let (_doc, chunks) = self.documents.load_chunks(source).await?;

        let rag = self.new_rag();
        rag.index_chunks(&chunks).await?;

        let embedding = &self.embedding;
        let manifest = IndexManifest::new(
            embedding.model_name(),
            embedding.dimension(),
            source.display().to_string(),
            chunks.len(),
        );

        info!(count = chunks.len(), "built index");
        Ok(VectorIndex {
            rag,
            manifest,
            origin: IndexOrigin::Built,
        })
    }

    #[instrument(skip(self, index, dir), fields(dir = %dir.display()))]
    pub async fn persist(&self, index: &VectorIndex, dir: &Path) -> Result<(), DomainError> {
        let entries = index.rag.vector_store().entries().await?;
        let snapshot = IndexSnapshot {
            manifest: IndexManifest {
                chunk_count: entries.len(),
                ..index.manifest.clone()
            },
            entries,
        };
        self.storage.persist(dir, &snapshot).await?;
        info!(count = snapshot.entries.len(), "persisted index");
        Ok(())
    }

    fn new_rag(&self) -> Arc<RagService> {
        Arc::new(
            RagService::new(self.embedding.clone(), (self.new_store)())
                .with_batch_size(self.batch_size),
        )
    }
}
