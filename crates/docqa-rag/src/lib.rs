//! docqa-rag: Document Q&A with retrieval-augmented generation and cited sources
//!
//! Documents (PDF, DOCX, TXT) are chunked into overlapping segments, embedded
//! into a similarity index and queried through a pipeline that assembles a
//! bounded context, asks a generator for an answer and returns the passages
//! it used. Embedding, search and generation are traits so backends can be
//! swapped or faked.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::RagPipeline;
pub use session::{RagSession, SessionStatus};
pub use types::{
    FileType, QueryOutcome, QueryRequest, QueryResponse, RetrievalHit, Segment, SourceDocument,
    SourceRecord,
};
