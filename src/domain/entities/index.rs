use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DocumentChunk, Embedding};

/// Bumped whenever the on-disk layout changes; older directories are rebuilt.
pub const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimension: usize,
    pub source: String,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    pub fn new(
        embedding_model: impl Into<String>,
        dimension: usize,
        source: impl Into<String>,
        chunk_count: usize,
    ) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            embedding_model: embedding_model.into(),
            dimension,
            source: source.into(),
            chunk_count,
            created_at: Utc::now(),
        }
    }
}

/// Everything needed to restore an index without touching the source document.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub manifest: IndexManifest,
    pub entries: Vec<(DocumentChunk, Embedding)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexProbe {
    Absent,
    Present,
}
