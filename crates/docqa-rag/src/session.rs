//! Caller-owned RAG session: document registry, index lifecycle and queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::ingestion::TextChunker;
use crate::pipeline::RagPipeline;
use crate::providers::{AnswerGenerator, EmbeddingProvider, SimilarityIndex};
use crate::retrieval::InMemoryIndex;
use crate::types::{
    DocumentSummary, FileType, QueryRequest, QueryResponse, Segment, SourceDocument,
};

/// A document that has been chunked and indexed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestedDocument {
    pub name: String,
    pub file_type: FileType,
    pub content_hash: String,
    pub chunks: usize,
    pub ingested_at: DateTime<Utc>,
}

/// Snapshot of session state for status endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: Uuid,
    /// True once an index exists
    pub ready: bool,
    pub documents_processed: usize,
    /// Segments currently held by the index
    pub total_chunks: usize,
    pub document_names: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_ingested_at: Option<DateTime<Utc>>,
    pub embedder: String,
    pub generator_model: String,
}

/// Explicit session state replacing any process-wide globals
///
/// The index and pipeline are created by the first ingestion that produces
/// segments and dropped again by `reset`.
pub struct RagSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    config: RagConfig,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn AnswerGenerator>,
    pipeline: Option<RagPipeline>,
    documents: Vec<IngestedDocument>,
}

impl RagSession {
    /// Create an empty session; fails on invalid configuration
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = TextChunker::from_config(&config.chunking)?;

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            config,
            chunker,
            embedder,
            generator,
            pipeline: None,
            documents: Vec::new(),
        })
    }

    /// Query against an existing index, e.g. one restored with `InMemoryIndex::load`
    pub fn with_index(mut self, index: Arc<dyn SimilarityIndex>) -> Self {
        self.pipeline = Some(RagPipeline::new(
            index,
            Arc::clone(&self.generator),
            &self.config,
        ));
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.pipeline.is_some()
    }

    pub fn documents(&self) -> &[IngestedDocument] {
        &self.documents
    }

    /// Chunk, embed and index `documents`, returning the chunk count of this call
    pub async fn ingest(&mut self, documents: &[SourceDocument]) -> Result<usize> {
        let summaries = self.ingest_with_summary(documents).await?;
        Ok(summaries.iter().map(|s| s.total_chunks).sum())
    }

    /// Like `ingest`, reporting per-document chunk counts and skipped duplicates
    pub async fn ingest_with_summary(
        &mut self,
        documents: &[SourceDocument],
    ) -> Result<Vec<DocumentSummary>> {
        let batch = self.plan_ingest(documents).index_segments().await?;
        self.commit_ingest(batch)
    }

    /// Deduplicate and chunk `documents` without touching the index
    ///
    /// The plan borrows nothing from the session, so the slow embedding step
    /// (`IngestPlan::index_segments`) can run without holding a session lock.
    /// Callers that share a session must not interleave two plans or a plan
    /// and `reset`; `commit_ingest` refuses a batch whose index was replaced.
    pub fn plan_ingest(&self, documents: &[SourceDocument]) -> IngestPlan {
        let mut summaries = Vec::with_capacity(documents.len());
        let mut pending = Vec::new();
        let mut segments: Vec<Segment> = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for doc in documents {
            let content_hash = doc.content_hash();
            let key = (doc.source_name.clone(), content_hash.clone());

            if self.is_ingested(&doc.source_name, &content_hash) || !seen.insert(key) {
                tracing::info!("Skipping {}: identical content already ingested", doc.source_name);
                summaries.push(DocumentSummary {
                    filename: doc.source_name.clone(),
                    file_type: doc.file_kind,
                    total_chunks: 0,
                    duplicate: true,
                });
                continue;
            }

            let doc_segments = self.chunker.chunk_document(doc);
            if doc_segments.is_empty() {
                tracing::warn!("No text extracted from {}; nothing to index", doc.source_name);
            }

            summaries.push(DocumentSummary {
                filename: doc.source_name.clone(),
                file_type: doc.file_kind,
                total_chunks: doc_segments.len(),
                duplicate: false,
            });
            if !doc_segments.is_empty() {
                pending.push(IngestedDocument {
                    name: doc.source_name.clone(),
                    file_type: doc.file_kind,
                    content_hash,
                    chunks: doc_segments.len(),
                    ingested_at: Utc::now(),
                });
                segments.extend(doc_segments);
            }
        }

        IngestPlan {
            summaries,
            pending,
            segments,
            target: self.pipeline.as_ref().map(|p| Arc::clone(p.index())),
            embedder: Arc::clone(&self.embedder),
        }
    }

    /// Record an indexed batch, installing the index if the batch created it
    pub fn commit_ingest(&mut self, batch: IndexedBatch) -> Result<Vec<DocumentSummary>> {
        if batch.added == 0 {
            tracing::warn!("No segments produced from {} documents", batch.summaries.len());
            return Ok(batch.summaries);
        }

        let current = self.pipeline.as_ref().map(|p| p.index());
        match (&batch.target, current) {
            (None, None) => {
                if let Some(index) = batch.created {
                    self.pipeline = Some(RagPipeline::new(
                        index,
                        Arc::clone(&self.generator),
                        &self.config,
                    ));
                }
            }
            (Some(target), Some(current)) if same_index(target, current) => {}
            _ => {
                return Err(Error::internal(
                    "session index changed while documents were being indexed",
                ))
            }
        }

        self.documents.extend(batch.pending);
        tracing::info!(
            "Ingested {} chunks from {} documents ({} documents in session)",
            batch.added,
            batch.summaries.len(),
            self.documents.len()
        );

        Ok(batch.summaries)
    }

    /// Add pre-chunked segments without rebuilding the index
    pub async fn update_index(&mut self, new_segments: Vec<Segment>) -> Result<usize> {
        let segments: Vec<Segment> = new_segments
            .into_iter()
            .filter(|s| !s.content.trim().is_empty())
            .collect();

        if segments.is_empty() {
            return Ok(0);
        }

        let added = self.index_segments(segments).await?;
        tracing::info!("Added {} segments to the index", added);
        Ok(added)
    }

    /// Answer `question` from the top `num_sources` passages
    ///
    /// Errors only when nothing has been ingested or the question is blank.
    pub async fn query(&self, question: &str, num_sources: usize) -> Result<QueryResponse> {
        let pipeline = self.ready_pipeline()?;
        let question = Self::validate_question(question)?;
        Ok(pipeline.query(question, num_sources).await)
    }

    /// Answer a `QueryRequest`, applying the configured source count and any history
    pub async fn query_request(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let pipeline = self.ready_pipeline()?;
        let question = Self::validate_question(&request.question)?;
        let num_sources = request
            .num_sources
            .unwrap_or(self.config.retrieval.num_sources);

        if request.history.is_empty() {
            Ok(pipeline.query(question, num_sources).await)
        } else {
            Ok(pipeline
                .query_with_history(question, &request.history, num_sources)
                .await)
        }
    }

    /// Drop the index, the pipeline and the document registry
    pub fn reset(&mut self) {
        tracing::info!(
            "Resetting session {} ({} documents)",
            self.id,
            self.documents.len()
        );
        self.pipeline = None;
        self.documents.clear();
    }

    pub async fn status(&self) -> SessionStatus {
        let total_chunks = match &self.pipeline {
            Some(pipeline) => pipeline.index().len().await.unwrap_or_else(|e| {
                tracing::warn!("Could not read index size: {}", e);
                0
            }),
            None => 0,
        };

        SessionStatus {
            session_id: self.id,
            ready: self.is_ready(),
            documents_processed: self.documents.len(),
            total_chunks,
            document_names: self.documents.iter().map(|d| d.name.clone()).collect(),
            created_at: self.created_at,
            last_ingested_at: self.documents.iter().map(|d| d.ingested_at).max(),
            embedder: self.embedder.name().to_string(),
            generator_model: self.generator.model().to_string(),
        }
    }

    /// True when `name` with identical content is already indexed
    fn is_ingested(&self, name: &str, content_hash: &str) -> bool {
        self.documents
            .iter()
            .any(|d| d.name == name && d.content_hash == content_hash)
    }

    fn ready_pipeline(&self) -> Result<&RagPipeline> {
        self.pipeline.as_ref().ok_or_else(|| {
            Error::NotReady("upload and process documents before asking questions".to_string())
        })
    }

    fn validate_question(question: &str) -> Result<&str> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::InvalidQuery("question must not be empty".to_string()));
        }
        Ok(question)
    }

    /// Create the index on first use, then add to it
    async fn index_segments(&mut self, segments: Vec<Segment>) -> Result<usize> {
        match &self.pipeline {
            Some(pipeline) => pipeline.index().add_segments(segments).await,
            None => {
                let index = InMemoryIndex::from_segments(Arc::clone(&self.embedder), segments).await?;
                let added = index.len().await?;
                tracing::info!("Created {} index with {} segments", index.name(), added);
                self.pipeline = Some(RagPipeline::new(
                    Arc::new(index),
                    Arc::clone(&self.generator),
                    &self.config,
                ));
                Ok(added)
            }
        }
    }
}

/// Deduplicated, chunked documents waiting to be embedded
pub struct IngestPlan {
    summaries: Vec<DocumentSummary>,
    pending: Vec<IngestedDocument>,
    segments: Vec<Segment>,
    target: Option<Arc<dyn SimilarityIndex>>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IngestPlan {
    /// Segments the plan will add
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Embed the planned segments into the session index, or a new one
    pub async fn index_segments(self) -> Result<IndexedBatch> {
        let mut batch = IndexedBatch {
            summaries: self.summaries,
            pending: self.pending,
            target: self.target,
            created: None,
            added: 0,
        };
        if self.segments.is_empty() {
            return Ok(batch);
        }

        match &batch.target {
            Some(index) => batch.added = index.add_segments(self.segments).await?,
            None => {
                let index = InMemoryIndex::from_segments(self.embedder, self.segments).await?;
                batch.added = index.len().await?;
                tracing::info!("Created {} index with {} segments", index.name(), batch.added);
                batch.created = Some(Arc::new(index));
            }
        }

        Ok(batch)
    }
}

/// Segments already in an index, waiting for `RagSession::commit_ingest`
pub struct IndexedBatch {
    summaries: Vec<DocumentSummary>,
    pending: Vec<IngestedDocument>,
    target: Option<Arc<dyn SimilarityIndex>>,
    created: Option<Arc<dyn SimilarityIndex>>,
    added: usize,
}

fn same_index(a: &Arc<dyn SimilarityIndex>, b: &Arc<dyn SimilarityIndex>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}
