//! Retrieval-augmented question answering over PDF reports.
//!
//! Documents are chunked, embedded and kept in an in-memory vector index that
//! can be persisted to a directory and reloaded on later runs. Queries pull
//! the closest chunks into a prompt and ask a hosted LLM, either for a whole
//! answer or as a stream of fragments; answers can then be judged for
//! faithfulness against the chunks they came from.

pub mod application;
pub mod domain;
pub mod infrastructure;
