pub mod config;
pub mod embedding;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod storage;
pub mod telemetry;
pub mod vector_store;

pub use config::{
    AppConfig, Config, EmbeddingConfig, EvaluationPrompts, LlmConfig, PipelineConfig,
    PromptsConfig, QueryPrompts, RagConfig,
};
pub use embedding::TextEmbedding;
pub use llm::OpenAiLlm;
pub use loader::FileLoader;
pub use pipeline::Pipeline;
pub use storage::JsonIndexStorage;
pub use telemetry::init_tracing;
pub use vector_store::InMemoryVectorStore;
