mod json;

pub use json::{JsonIndexStorage, DOCSTORE_FILE, INDEX_STORE_FILE, VECTOR_STORE_FILE};
