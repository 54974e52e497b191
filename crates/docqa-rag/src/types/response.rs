//! Response types for RAG queries and ingestion

use serde::{Deserialize, Serialize};

use super::document::{FileType, Segment, SegmentMetadata};
use crate::generation::citation::truncate_content;

/// Maximum characters of a source shown back to the caller
pub const SOURCE_PREVIEW_CHARS: usize = 500;

/// A segment returned by the similarity index for one query
///
/// `score` is a similarity: higher means more relevant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalHit {
    /// Segment text
    pub content: String,
    /// Segment metadata
    pub metadata: SegmentMetadata,
    /// Similarity score (cosine, higher is better)
    pub score: f32,
}

impl RetrievalHit {
    /// Create a hit from a stored segment and its score
    pub fn from_segment(segment: &Segment, score: f32) -> Self {
        Self {
            content: segment.content.clone(),
            metadata: segment.metadata.clone(),
            score,
        }
    }

    /// Source name used in context labels
    pub fn source_name(&self) -> &str {
        &self.metadata.source
    }
}

/// A source shown alongside an answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRecord {
    /// Segment text, truncated for display
    pub content: String,
    /// Similarity score of the hit
    pub score: f32,
    /// Segment metadata
    pub metadata: SegmentMetadata,
}

impl SourceRecord {
    /// Build a display record, truncating content to `max_chars` (plus `...`)
    pub fn from_hit(hit: &RetrievalHit, max_chars: usize) -> Self {
        Self {
            content: truncate_content(&hit.content, max_chars),
            score: hit.score,
            metadata: hit.metadata.clone(),
        }
    }
}

/// How a query ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    /// Generated answer grounded in retrieved context
    Answered,
    /// Retrieval succeeded but returned nothing
    NoRelevantInformation,
    /// The similarity index could not be searched
    RetrievalFailed,
    /// Not even the top passage fits into the context window
    ContextBudgetExceeded,
    /// The generator errored, timed out or returned nothing
    GenerationFailed,
}

impl QueryOutcome {
    /// True when the answer is not a fully grounded generation
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Answered | Self::NoRelevantInformation)
    }
}

/// Response from a RAG query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Answer text (always present, even on failure)
    pub answer: String,
    /// Sources in the order used to build the context
    pub sources: Vec<SourceRecord>,
    /// How the query ended
    pub outcome: QueryOutcome,
    /// True when `answer` is a fallback rather than a grounded generation
    pub degraded: bool,
    /// 1-based `[Source N]` labels referenced by the answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cited_sources: Vec<usize>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl QueryResponse {
    /// Create a response for the given outcome
    pub fn new(answer: String, sources: Vec<SourceRecord>, outcome: QueryOutcome) -> Self {
        Self {
            answer,
            sources,
            degraded: outcome.is_degraded(),
            outcome,
            cited_sources: Vec::new(),
            processing_time_ms: 0,
        }
    }

    /// Response when retrieval returned no hits
    pub fn not_found() -> Self {
        Self::new(
            "I couldn't find any relevant information in the uploaded documents to answer your question."
                .to_string(),
            Vec::new(),
            QueryOutcome::NoRelevantInformation,
        )
    }

    /// Response when the index could not be searched
    pub fn retrieval_failed(detail: &str) -> Self {
        Self::new(
            format!(
                "I couldn't search the uploaded documents right now ({}). Please try again.",
                detail
            ),
            Vec::new(),
            QueryOutcome::RetrievalFailed,
        )
    }

    /// Attach elapsed time
    pub fn with_processing_time(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }
}

/// Response from document ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Whether at least one document produced segments
    pub success: bool,
    /// Ingested documents
    pub documents: Vec<DocumentSummary>,
    /// Total chunks created across all documents
    pub total_chunks_created: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Any errors encountered (partial success)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<IngestError>,
}

/// Summary of an ingested document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Filename
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Number of chunks created
    pub total_chunks: usize,
    /// Skipped because identical content was already ingested
    #[serde(default)]
    pub duplicate: bool,
}

/// Per-file ingestion error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestError {
    /// Filename
    pub filename: String,
    /// Error message
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(content: &str) -> RetrievalHit {
        RetrievalHit {
            content: content.to_string(),
            metadata: SegmentMetadata {
                source: "doc.txt".to_string(),
                chunk_index: 0,
                source_kind: FileType::Txt,
            },
            score: 0.8,
        }
    }

    #[test]
    fn test_source_truncated_to_503_chars() {
        let record = SourceRecord::from_hit(&hit(&"a".repeat(600)), SOURCE_PREVIEW_CHARS);
        assert_eq!(record.content.chars().count(), 503);
        assert!(record.content.ends_with("..."));
        assert_eq!(record.score, 0.8);
    }

    #[test]
    fn test_short_source_untouched() {
        let record = SourceRecord::from_hit(&hit("short passage"), SOURCE_PREVIEW_CHARS);
        assert_eq!(record.content, "short passage");
    }

    #[test]
    fn test_degraded_flag_follows_outcome() {
        assert!(!QueryResponse::not_found().degraded);
        assert!(QueryResponse::retrieval_failed("index offline").degraded);
        assert!(QueryOutcome::GenerationFailed.is_degraded());
        assert!(!QueryOutcome::Answered.is_degraded());
    }
}
