use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::{stream, StreamExt};

use crate::domain::{
    ports::{DocumentLoader, EmbeddingService, LlmService, VectorStore},
    Document, DocumentChunk, DomainError, Embedding, SearchResult, TokenStream,
};

const DIM: usize = 32;

pub(crate) struct StaticLoader {
    text: Option<String>,
    loads: AtomicUsize,
}

impl StaticLoader {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentLoader for StaticLoader {
    async fn load(&self, path: &Path) -> Result<Document, DomainError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.text {
            Some(text) => Ok(Document::new(path.display().to_string(), text.clone())),
            None => Err(DomainError::io(path, "No such file or directory")),
        }
    }
}

/// Bag-of-words hashed into a fixed number of buckets.
pub(crate) struct KeywordEmbedding {
    calls: AtomicUsize,
}

impl KeywordEmbedding {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vectorize(text: &str) -> Embedding {
        let mut v = vec![0.0f32; DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .to_lowercase()
                .bytes()
                .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
            v[bucket % DIM] += 1.0;
        }
        Embedding::new(v)
    }
}

#[async_trait]
impl EmbeddingService for KeywordEmbedding {
    async fn embed(&self, text: &str) -> Result<Embedding, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vectorize(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, DomainError> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "keyword-stub"
    }
}

/// Answers with the prompt it was given; streams it word by word.
#[derive(Default)]
pub(crate) struct EchoLlm {
    pub prompts: Mutex<Vec<String>>,
}

impl EchoLlm {
    fn record(&self, prompt: &str) {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
    }
}

#[async_trait]
impl LlmService for EchoLlm {
    async fn complete(&self, prompt: &str) -> Result<String, DomainError> {
        self.record(prompt);
        Ok(prompt.to_string())
    }

    async fn complete_with_system(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        self.complete(prompt).await
    }

    async fn stream_with_system(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<TokenStream, DomainError> {
        self.record(prompt);
        let fragments: Vec<Result<String, DomainError>> = prompt
            .split_inclusive(' ')
            .map(|s| Ok(s.to_string()))
            .collect();
        Ok(stream::iter(fragments).boxed())
    }
}

/// Replies with a fixed verdict regardless of the prompt.
pub(crate) struct FixedLlm {
    reply: String,
    calls: AtomicUsize,
}

impl FixedLlm {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmService for FixedLlm {
    async fn complete(&self, _prompt: &str) -> Result<String, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    async fn complete_with_system(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        self.complete(prompt).await
    }

    async fn stream_with_system(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<TokenStream, DomainError> {
        let reply = self.complete(prompt).await?;
        Ok(stream::iter(vec![Ok(reply)]).boxed())
    }
}

/// Minimal vector store for service tests; the real one lives in infrastructure.
#[derive(Default)]
pub(crate) struct VecStore {
    entries: Mutex<Vec<(DocumentChunk, Embedding)>>,
}

#[async_trait]
impl VectorStore for VecStore {
    async fn upsert(
        &self,
        chunk: &DocumentChunk,
        embedding: &Embedding,
    ) -> Result<(), DomainError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        entries.retain(|(c, _)| c.id != chunk.id);
        entries.push((chunk.clone(), embedding.clone()));
        Ok(())
    }

    async fn search(
        &self,
        query: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchResult>, DomainError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        let mut results: Vec<SearchResult> = entries
            .iter()
            .map(|(chunk, emb)| SearchResult {
                chunk: chunk.clone(),
                score: query.cosine_similarity(emb),
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(top_k);
        Ok(results)
    }

    async fn entries(&self) -> Result<Vec<(DocumentChunk, Embedding)>, DomainError> {
        Ok(self
            .entries
            .lock()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .clone())
    }

    async fn len(&self) -> Result<usize, DomainError> {
        Ok(self
            .entries
            .lock()
            .map_err(|e| DomainError::internal(e.to_string()))?
            .len())
    }
}
