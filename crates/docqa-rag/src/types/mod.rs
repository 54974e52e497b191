//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{FileType, Segment, SegmentMetadata, SourceDocument};
pub use query::{ChatRole, ChatTurn, QueryRequest};
pub use response::{
    DocumentSummary, IngestError, IngestResponse, QueryOutcome, QueryResponse, RetrievalHit,
    SourceRecord, SOURCE_PREVIEW_CHARS,
};
