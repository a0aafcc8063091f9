mod document;
mod evaluation;
mod index;
mod prompt;
mod query;
mod rag;

#[cfg(test)]
pub(crate) mod test_support;

pub use document::DocumentService;
pub use evaluation::{parse_verdict, FaithfulnessEvaluator, RelevancyEvaluator};
pub use index::{CorruptIndexPolicy, IndexOrigin, IndexService, VectorIndex, VectorStoreFactory};
pub use prompt::{
    render_template, DEFAULT_FAITHFULNESS_TEMPLATE, DEFAULT_RELEVANCY_TEMPLATE,
    DEFAULT_TEXT_QA_TEMPLATE,
};
pub use query::{QueryEngine, QuerySettings};
pub use rag::RagService;
