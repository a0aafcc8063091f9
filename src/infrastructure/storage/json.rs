use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{
    ports::IndexStorage, DocumentChunk, DomainError, Embedding, IndexManifest, IndexProbe,
    IndexSnapshot, INDEX_FORMAT_VERSION,
};

pub const DOCSTORE_FILE: &str = "docstore.json";
pub const VECTOR_STORE_FILE: &str = "vector_store.json";
/// Written last; its presence marks a complete index.
pub const INDEX_STORE_FILE: &str = "index_store.json";

#[derive(Debug, Serialize, Deserialize)]
struct DocStoreFile {
    chunks: Vec<DocumentChunk>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VectorStoreFile {
    embedding_dict: BTreeMap<Uuid, Embedding>,
}

/// Persists an index as three JSON files inside one directory.
#[derive(Debug, Default, Clone)]
pub struct JsonIndexStorage;

impl JsonIndexStorage {
    pub fn new() -> Self {
        Self
    }

    async fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, DomainError> {
        let path = dir.join(file);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| DomainError::corrupt(dir, format!("cannot read {file}: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| DomainError::corrupt(dir, format!("cannot decode {file}: {e}")))
    }

    async fn write_json<T: Serialize + Sync>(
        dir: &Path,
        file: &str,
        value: &T,
        pretty: bool,
    ) -> Result<(), DomainError> {
        let path = dir.join(file);
        let tmp: PathBuf = path.with_extension("json.tmp");
        let bytes = if pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
        .map_err(|e| DomainError::internal(format!("Failed to encode {file}: {e}")))?;

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| DomainError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| DomainError::io(&path, e))?;
        Ok(())
    }

    async fn read_manifest(dir: &Path) -> Result<IndexManifest, DomainError> {
        let raw: serde_json::Value = Self::read_json(dir, INDEX_STORE_FILE).await?;

        let version = raw.get("format_version").and_then(serde_json::Value::as_u64);
        if version != Some(u64::from(INDEX_FORMAT_VERSION)) {
            return Err(DomainError::incompatible(
                dir,
                format!(
                    "format version {:?}, expected {}",
                    version, INDEX_FORMAT_VERSION
                ),
            ));
        }

        serde_json::from_value(raw).map_err(|e| {
            DomainError::corrupt(dir, format!("cannot decode {INDEX_STORE_FILE}: {e}"))
        })
    }
}

#[async_trait]
impl IndexStorage for JsonIndexStorage {
    fn probe(&self, dir: &Path) -> Result<IndexProbe, DomainError> {
        if !dir.exists() {
            return Ok(IndexProbe::Absent);
        }
        if dir.is_dir() && !dir.join(INDEX_STORE_FILE).exists() {
            debug!(dir = %dir.display(), "directory has no index manifest");
            return Ok(IndexProbe::Absent);
        }
        Ok(IndexProbe::Present)
    }

    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    async fn load(&self, dir: &Path) -> Result<IndexSnapshot, DomainError> {
        let manifest = Self::read_manifest(dir).await?;
        let docstore: DocStoreFile = Self::read_json(dir, DOCSTORE_FILE).await?;
        let mut vectors: VectorStoreFile = Self::read_json(dir, VECTOR_STORE_FILE).await?;

        if docstore.chunks.len() != manifest.chunk_count
            || vectors.embedding_dict.len() != manifest.chunk_count
        {
            return Err(DomainError::corrupt(
                dir,
                format!(
                    "manifest lists {} chunks, found {} chunks and {} vectors",
                    manifest.chunk_count,
                    docstore.chunks.len(),
                    vectors.embedding_dict.len()
                ),
            ));
        }

        let mut entries = Vec::with_capacity(docstore.chunks.len());
        for chunk in docstore.chunks {
            let embedding = vectors.embedding_dict.remove(&chunk.id).ok_or_else(|| {
                DomainError::corrupt(dir, format!("no vector for chunk {}", chunk.id))
            })?;
            entries.push((chunk, embedding));
        }

        Ok(IndexSnapshot { manifest, entries })
    }

    #[instrument(
        skip(self, dir, snapshot),
        fields(dir = %dir.display(), count = snapshot.entries.len())
    )]
    async fn persist(&self, dir: &Path, snapshot: &IndexSnapshot) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DomainError::io(dir, e))?;

        let docstore = DocStoreFile {
            chunks: snapshot.entries.iter().map(|(c, _)| c.clone()).collect(),
        };
        let vectors = VectorStoreFile {
            embedding_dict: snapshot
                .entries
                .iter()
                .map(|(c, e)| (c.id, e.clone()))
                .collect(),
        };

        Self::write_json(dir, DOCSTORE_FILE, &docstore, false).await?;
        Self::write_json(dir, VECTOR_STORE_FILE, &vectors, false).await?;
        Self::write_json(dir, INDEX_STORE_FILE, &snapshot.manifest, true).await?;
        Ok(())
    }
}
