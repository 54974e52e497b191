//! Document ingestion: multi-format parsing and chunking

mod chunker;
mod parser;

pub use chunker::TextChunker;
pub use parser::{FileParser, ParsedDocument};
