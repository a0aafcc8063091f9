use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use pretty_assertions::assert_eq;

use pdf_rag::application::{CorruptIndexPolicy, IndexOrigin};
use pdf_rag::domain::ports::{DocumentLoader, EmbeddingService, Evaluator, LlmService};
use pdf_rag::domain::{Document, DomainError, Embedding, TokenStream};
use pdf_rag::infrastructure::{AppConfig, FileLoader, Pipeline};

const BRANCHES: &str = "Poslovnice u inozemstvu: Zagreb, Split, Dubrovnik";
const REPORT: &str = "Poslovnice u inozemstvu: Zagreb, Split, Dubrovnik\n\n\
    Flota zrakoplova obuhvaca dvanaest zrakoplova.\n\n\
    Financijski rezultati poslovanja su stabilni.";
const DIM: usize = 64;

struct CountingLoader {
    loads: AtomicUsize,
}

impl CountingLoader {
    fn new() -> Self {
        Self {
            loads: AtomicUsize::new(0),
        }
    }

    fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentLoader for CountingLoader {
    async fn load(&self, path: &Path) -> Result<Document, DomainError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Document::new(path.display().to_string(), REPORT))
    }
}

/// Deterministic bag-of-words hashing.
struct KeywordEmbedding {
    calls: AtomicUsize,
}

impl KeywordEmbedding {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
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
                .fold(17usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize));
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

/// Echoes the query prompt back as the answer and always judges "YES".
struct StubLlm;

#[async_trait]
impl LlmService for StubLlm {
    async fn complete(&self, _prompt: &str) -> Result<String, DomainError> {
        Ok("YES".to_string())
    }

    async fn complete_with_system(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        Ok(prompt.to_string())
    }

    async fn stream_with_system(
        &self,
        _system: &str,
        prompt: &str,
    ) -> Result<TokenStream, DomainError> {
        let fragments: Vec<Result<String, DomainError>> = prompt
            .split_inclusive(char::is_whitespace)
            .map(|s| Ok(s.to_string()))
            .collect();
        Ok(stream::iter(fragments).boxed())
    }
}

struct Harness {
    loader: Arc<CountingLoader>,
    embedding: Arc<KeywordEmbedding>,
    pipeline: Pipeline,
}

fn config(persist_dir: Option<PathBuf>, policy: CorruptIndexPolicy) -> AppConfig {
    let mut app = AppConfig::default();
    app.config.pipeline.source = PathBuf::from("godisnje-izvjesce-2021-CA.pdf");
    app.config.pipeline.persist_dir = persist_dir;
    app.config.pipeline.corrupt_index_policy = policy;
    app.config.rag.chunk_size = 60;
    app.config.rag.chunk_overlap = 0;
    app.config.rag.top_k = 2;
    app
}

fn harness(persist_dir: Option<PathBuf>, policy: CorruptIndexPolicy) -> Harness {
    let loader = Arc::new(CountingLoader::new());
    let embedding = Arc::new(KeywordEmbedding::new());
    let pipeline = Pipeline::with_services(
        config(persist_dir, policy),
        embedding.clone(),
        Arc::new(StubLlm),
        loader.clone(),
    );
    Harness {
        loader,
        embedding,
        pipeline,
    }
}

#[tokio::test]
async fn second_run_reuses_persisted_index_without_reading_source() {
    let dir = tempfile::tempdir().unwrap();
    let persist_dir = dir.path().join("storage").join("2021");

    let first = harness(Some(persist_dir.clone()), CorruptIndexPolicy::Rebuild);
    let built = first.pipeline.acquire_index().await.unwrap();
    assert_eq!(built.origin(), IndexOrigin::Built);
    assert_eq!(first.loader.load_count(), 1);
    assert_eq!(first.embedding.call_count(), 3);
    assert!(persist_dir.join("index_store.json").exists());

    let second = harness(Some(persist_dir.clone()), CorruptIndexPolicy::Rebuild);
    let loaded = second.pipeline.acquire_index().await.unwrap();
    assert_eq!(loaded.origin(), IndexOrigin::Loaded);
    assert_eq!(second.loader.load_count(), 0);
    assert_eq!(second.embedding.call_count(), 0);
    assert_eq!(loaded.manifest().chunk_count, built.manifest().chunk_count);

    let response = second
        .pipeline
        .query_engine(&loaded)
        .query("Poslovnice u inozemstvu")
        .await
        .unwrap();
    assert_eq!(response.source_nodes[0].chunk.content, BRANCHES);
}

#[tokio::test]
async fn empty_persist_dir_triggers_build_and_persist() {
    let dir = tempfile::tempdir().unwrap();

    let h = harness(Some(dir.path().to_path_buf()), CorruptIndexPolicy::Rebuild);
    let index = h.pipeline.acquire_index().await.unwrap();

    assert_eq!(index.origin(), IndexOrigin::Built);
    assert_eq!(h.loader.load_count(), 1);
    assert!(dir.path().join("docstore.json").exists());
    assert!(dir.path().join("vector_store.json").exists());
}

#[tokio::test]
async fn unreadable_index_is_rebuilt_and_then_reused() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index_store.json"), b"\x00\x01 garbage").unwrap();

    let first = harness(Some(dir.path().to_path_buf()), CorruptIndexPolicy::Rebuild);
    let rebuilt = first.pipeline.acquire_index().await.unwrap();
    assert_eq!(rebuilt.origin(), IndexOrigin::Built);
    assert_eq!(first.loader.load_count(), 1);

    let second = harness(Some(dir.path().to_path_buf()), CorruptIndexPolicy::Rebuild);
    let reused = second.pipeline.acquire_index().await.unwrap();
    assert_eq!(reused.origin(), IndexOrigin::Loaded);
    assert_eq!(second.loader.load_count(), 0);
}

#[tokio::test]
async fn corrupt_index_surfaces_when_policy_is_fail() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index_store.json"), b"{ truncated").unwrap();

    let h = harness(Some(dir.path().to_path_buf()), CorruptIndexPolicy::Fail);
    let err = h.pipeline.acquire_index().await.err().unwrap();

    assert!(matches!(err, DomainError::CorruptIndex { .. }));
    assert_eq!(h.loader.load_count(), 0);
}

#[tokio::test]
async fn in_memory_run_never_touches_disk() {
    let h = harness(None, CorruptIndexPolicy::Rebuild);

    let first = h.pipeline.acquire_index().await.unwrap();
    let second = h.pipeline.acquire_index().await.unwrap();

    assert_eq!(first.origin(), IndexOrigin::Built);
    assert_eq!(second.origin(), IndexOrigin::Built);
    assert_eq!(h.loader.load_count(), 2);
}

#[tokio::test]
async fn streaming_concatenation_equals_synchronous_answer() {
    let h = harness(None, CorruptIndexPolicy::Rebuild);
    let index = h.pipeline.acquire_index().await.unwrap();
    let engine = h.pipeline.query_engine(&index);

    let sync = engine.query("Poslovnice u inozemstvu").await.unwrap();

    let mut streaming = engine.query_streaming("Poslovnice u inozemstvu").await.unwrap();
    let mut fragments = Vec::new();
    while let Some(fragment) = streaming.response_gen.next().await {
        fragments.push(fragment.unwrap());
    }

    assert!(fragments.len() > 1);
    assert_eq!(fragments.concat(), sync.response);
    assert!(streaming.response_gen.next().await.is_none());
}

#[tokio::test]
async fn branches_question_is_answered_from_matching_chunk_and_judged_faithful() {
    let h = harness(None, CorruptIndexPolicy::Rebuild);
    let index = h.pipeline.acquire_index().await.unwrap();

    let response = h
        .pipeline
        .query_engine(&index)
        .query("Poslovnice u inozemstvu")
        .await
        .unwrap();

    let branch_node = response
        .source_nodes
        .iter()
        .find(|n| n.chunk.content == BRANCHES)
        .expect("branches chunk retrieved");
    assert!(response.response.contains(BRANCHES));

    let evaluator = h.pipeline.faithfulness_evaluator();
    let overall = evaluator.evaluate_response(None, &response).await.unwrap();
    assert!(overall.passing);
    assert_eq!(overall.contexts.len(), response.source_nodes.len());

    let per_chunk = evaluator
        .evaluate(
            None,
            &response.response,
            std::slice::from_ref(&branch_node.chunk.content),
        )
        .await
        .unwrap();
    assert!(per_chunk.passing);
}

#[tokio::test]
async fn relevancy_judges_against_the_question() {
    let h = harness(None, CorruptIndexPolicy::Rebuild);
    let index = h.pipeline.acquire_index().await.unwrap();
    let question = "Poslovnice u inozemstvu";
    let response = h.pipeline.query_engine(&index).query(question).await.unwrap();

    let result = h
        .pipeline
        .relevancy_evaluator()
        .evaluate_response(Some(question), &response)
        .await
        .unwrap();

    assert!(result.passing);
    assert_eq!(result.query.as_deref(), Some(question));
}

#[tokio::test]
async fn text_source_is_loaded_from_disk_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("izvjesce.txt");
    std::fs::write(&source, REPORT).unwrap();

    let mut app = config(Some(dir.path().join("storage")), CorruptIndexPolicy::Rebuild);
    app.config.pipeline.source = source;
    let pipeline = Pipeline::with_services(
        app,
        Arc::new(KeywordEmbedding::new()),
        Arc::new(StubLlm),
        Arc::new(FileLoader::new()),
    );

    let index = pipeline.acquire_index().await.unwrap();

    assert_eq!(index.manifest().chunk_count, 3);
    assert!(index.manifest().source.ends_with("izvjesce.txt"));
}

#[tokio::test]
async fn earlier_index_keeps_answering_from_its_own_source() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    std::fs::write(&a, "Poslovnice: Zagreb").unwrap();
    std::fs::write(&b, "Flota zrakoplova").unwrap();

    let pipeline = Pipeline::with_services(
        config(None, CorruptIndexPolicy::Rebuild),
        Arc::new(KeywordEmbedding::new()),
        Arc::new(StubLlm),
        Arc::new(FileLoader::new()),
    );

    let index_a = pipeline.indexer().build(&a).await.unwrap();
    let engine_a = pipeline.query_engine(&index_a);
    let index_b = pipeline.indexer().build(&b).await.unwrap();

    let from_a = engine_a.query("Zagreb").await.unwrap();
    let from_b = pipeline.query_engine(&index_b).query("Flota").await.unwrap();

    let sources = |r: &pdf_rag::domain::QueryResponse| -> Vec<String> {
        r.source_nodes.iter().map(|n| n.chunk.content.clone()).collect()
    };
    assert_eq!(sources(&from_a), vec!["Poslovnice: Zagreb"]);
    assert_eq!(sources(&from_b), vec!["Flota zrakoplova"]);
    assert!(index_a.manifest().source.ends_with("a.txt"));
}
