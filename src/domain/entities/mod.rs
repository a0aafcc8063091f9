mod document;
mod embedding;
mod index;
mod response;

pub use document::{chunk_content, ChunkMetadata, Document, DocumentChunk, SearchResult};
pub use embedding::Embedding;
pub use index::{IndexManifest, IndexProbe, IndexSnapshot, INDEX_FORMAT_VERSION};
pub use response::{EvaluationResult, QueryResponse, StreamingResponse, TokenStream};
