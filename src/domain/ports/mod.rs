mod document_loader;
mod embedding;
mod evaluator;
mod index_storage;
mod llm;
mod vector_store;

pub use document_loader::DocumentLoader;
pub use embedding::EmbeddingService;
pub use evaluator::Evaluator;
pub use index_storage::IndexStorage;
pub use llm::LlmService;
pub use vector_store::VectorStore;
