//! End-to-end session tests with deterministic in-process providers

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

use docqa_rag::config::RagConfig;
use docqa_rag::providers::{AnswerGenerator, EmbeddingProvider, SimilarityIndex};
use docqa_rag::retrieval::InMemoryIndex;
use docqa_rag::types::{ChatTurn, QueryRequest};
use docqa_rag::{Error, FileType, QueryOutcome, RagSession, Result, Segment, SourceDocument};

/// Bag-of-words embedder hashing each word into one of 64 buckets
struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0; 64];
        for word in text.split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if word.is_empty() {
                continue;
            }
            let bucket = word
                .bytes()
                .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize))
                % 64;
            v[bucket] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        64
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Generator that replays a fixed reply and records every prompt
struct ScriptedGenerator {
    reply: Option<&'static str>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn replying(reply: &'static str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl AnswerGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.reply
            .map(str::to_string)
            .ok_or_else(|| Error::llm("service unavailable"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.reply.is_some())
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

fn small_chunks() -> RagConfig {
    let mut config = RagConfig::default();
    config.chunking.chunk_size = 120;
    config.chunking.chunk_overlap = 20;
    config
}

fn session(generator: Arc<ScriptedGenerator>) -> RagSession {
    RagSession::new(small_chunks(), Arc::new(KeywordEmbedder), generator).unwrap()
}

fn corpus() -> Vec<SourceDocument> {
    vec![
        SourceDocument::new(
            "rust.txt",
            FileType::Txt,
            "Rust guarantees memory safety through ownership. Every value has a single owner. \
             Borrowing lets code use a value without taking ownership. The borrow checker \
             enforces these rules at compile time. Lifetimes describe how long references live.",
        ),
        SourceDocument::new(
            "tea.docx",
            FileType::Docx,
            "Green tea is steeped at a lower temperature than black tea. Oolong sits between \
             them. Water that is too hot makes green tea bitter.",
        ),
    ]
}

#[tokio::test]
async fn test_ingest_then_query() {
    let generator = ScriptedGenerator::replying("Ownership means one owner per value [Source 1].");
    let mut session = session(generator.clone());

    let chunks = assert_ok!(session.ingest(&corpus()).await);
    assert!(chunks >= 3);

    let response = assert_ok!(session.query("What does ownership mean in Rust?", 2).await);

    assert_eq!(response.outcome, QueryOutcome::Answered);
    assert!(!response.degraded);
    assert!(!response.sources.is_empty() && response.sources.len() <= 2);
    assert_eq!(response.sources[0].metadata.source, "rust.txt");
    assert_eq!(response.cited_sources, vec![1]);
    for pair in response.sources.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let prompts = generator.prompts.lock();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("[Source 1 - rust.txt]"));
}

#[tokio::test]
async fn test_query_before_ingest_is_not_ready() {
    let session = session(ScriptedGenerator::replying("unused"));

    let err = assert_err!(session.query("anything?", 4).await);

    assert!(matches!(err, Error::NotReady(_)));
    assert!(err.is_precondition());
}

#[tokio::test]
async fn test_blank_question_rejected() {
    let mut session = session(ScriptedGenerator::replying("unused"));
    assert_ok!(session.ingest(&corpus()).await);

    let err = assert_err!(session.query("   ", 4).await);

    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[tokio::test]
async fn test_duplicate_documents_skipped() {
    let mut session = session(ScriptedGenerator::replying("ok"));

    let first = assert_ok!(session.ingest(&corpus()).await);
    let second = assert_ok!(session.ingest(&corpus()).await);
    let status = session.status().await;

    assert!(first > 0);
    assert_eq!(second, 0);
    assert_eq!(status.documents_processed, 2);
    assert_eq!(status.total_chunks, first);

    // Same name, different text is a new version
    let edited = SourceDocument::new("tea.docx", FileType::Docx, "White tea is barely processed.");
    assert_eq!(assert_ok!(session.ingest(&[edited]).await), 1);
}

#[tokio::test]
async fn test_duplicates_within_one_batch() {
    let mut session = session(ScriptedGenerator::replying("ok"));
    let doc = SourceDocument::new("a.txt", FileType::Txt, "Only once.");

    let summaries = assert_ok!(session.ingest_with_summary(&[doc.clone(), doc]).await);

    assert_eq!(summaries.len(), 2);
    assert!(!summaries[0].duplicate);
    assert!(summaries[1].duplicate);
    assert_eq!(summaries[1].total_chunks, 0);
}

#[tokio::test]
async fn test_blank_documents_do_not_create_index() {
    let mut session = session(ScriptedGenerator::replying("unused"));
    let blank = SourceDocument::new("scan.pdf", FileType::Pdf, "  \n\n ");

    assert_eq!(assert_ok!(session.ingest(&[blank]).await), 0);
    assert!(!session.is_ready());
    assert!(matches!(session.query("hello?", 4).await, Err(Error::NotReady(_))));
}

#[tokio::test]
async fn test_update_index_adds_incrementally() {
    let mut session = session(ScriptedGenerator::replying("Tea [Source 1]."));
    let chunks = assert_ok!(session.ingest(&corpus()).await);

    let added = assert_ok!(
        session
            .update_index(vec![
                Segment::new("Matcha is powdered green tea.".to_string(), "notes.txt", 0, FileType::Txt),
                Segment::new("   ".to_string(), "notes.txt", 1, FileType::Txt),
            ])
            .await
    );

    assert_eq!(added, 1);
    assert_eq!(session.status().await.total_chunks, chunks + 1);

    let response = assert_ok!(session.query("What is matcha powdered tea?", 1).await);
    assert_eq!(response.sources[0].metadata.source, "notes.txt");
}

#[tokio::test]
async fn test_update_index_before_ingest_creates_index() {
    let mut session = session(ScriptedGenerator::replying("ok"));

    let added = assert_ok!(
        session
            .update_index(vec![Segment::new("Loose text.".to_string(), "x.txt", 0, FileType::Txt)])
            .await
    );

    assert_eq!(added, 1);
    assert!(session.is_ready());
}

#[tokio::test]
async fn test_generation_failure_keeps_sources() {
    let mut session = session(ScriptedGenerator::failing());
    assert_ok!(session.ingest(&corpus()).await);

    let response = assert_ok!(session.query("How hot should green tea water be?", 3).await);

    assert_eq!(response.outcome, QueryOutcome::GenerationFailed);
    assert!(response.degraded);
    assert!(response.answer.contains("service unavailable"));
    assert_eq!(response.sources.len(), 3);
}

#[tokio::test]
async fn test_reset_clears_everything() {
    let mut session = session(ScriptedGenerator::replying("ok"));
    assert_ok!(session.ingest(&corpus()).await);

    session.reset();
    let status = session.status().await;

    assert!(!status.ready);
    assert_eq!(status.documents_processed, 0);
    assert_eq!(status.total_chunks, 0);
    assert!(matches!(session.query("anything?", 4).await, Err(Error::NotReady(_))));

    // Previously seen documents can be ingested again
    assert!(assert_ok!(session.ingest(&corpus()).await) > 0);
}

#[tokio::test]
async fn test_request_with_history_and_default_sources() {
    let generator = ScriptedGenerator::replying("Black tea uses hotter water.");
    let mut session = session(generator.clone());
    assert_ok!(session.ingest(&corpus()).await);

    let request = QueryRequest::new("And black tea?")
        .with_history(vec![ChatTurn::user("How hot for green tea?"), ChatTurn::assistant("Cooler.")]);
    let response = assert_ok!(session.query_request(&request).await);

    assert_eq!(response.outcome, QueryOutcome::Answered);
    assert!(response.sources.len() <= session.config().retrieval.num_sources);
    assert!(generator.prompts.lock()[0].contains("Current question: And black tea?"));
}

#[tokio::test]
async fn test_restored_index_is_queryable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    let chunker = docqa_rag::ingestion::TextChunker::new(120, 20).unwrap();
    let segments: Vec<Segment> = corpus().iter().flat_map(|d| chunker.chunk_document(d)).collect();
    let index = InMemoryIndex::from_segments(Arc::new(KeywordEmbedder), segments).await.unwrap();
    index.save(&path).unwrap();

    let restored = InMemoryIndex::load(&path, Arc::new(KeywordEmbedder)).unwrap();
    let total = restored.len().await.unwrap();
    let session = session(ScriptedGenerator::replying("ok")).with_index(Arc::new(restored));

    assert!(session.is_ready());
    assert_eq!(session.status().await.total_chunks, total);
    let response = assert_ok!(session.query("borrow checker rules", 2).await);
    assert_eq!(response.outcome, QueryOutcome::Answered);
}
