//! Document and segment types with source tracking for citations

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
}

impl FileType {
    /// Detect file type from extension; `None` for anything unsupported
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" => Some(Self::Txt),
            _ => None,
        }
    }

    /// Detect file type from a filename's last extension
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    /// Lowercase tag stored in segment metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Txt => "Text File",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw extracted text handed to ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Source identifier shown in citations (usually the uploaded filename)
    pub source_name: String,
    /// File kind the text was extracted from
    pub file_kind: FileType,
    /// Extracted text
    pub raw_text: String,
}

impl SourceDocument {
    /// Create a new source document
    pub fn new(source_name: impl Into<String>, file_kind: FileType, raw_text: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            file_kind,
            raw_text: raw_text.into(),
        }
    }

    /// SHA-256 of the extracted text, used to skip duplicate ingestion
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.raw_text.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Positional metadata carried by every segment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SegmentMetadata {
    /// Source document name
    pub source: String,
    /// 0-based, contiguous index within the source document
    pub chunk_index: u32,
    /// File kind of the source document
    pub source_kind: FileType,
}

/// A retrievable slice of a source document
///
/// Produced only by the chunker and never mutated afterwards; the index keeps
/// its own copy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Text content (never empty)
    pub content: String,
    /// Source metadata
    pub metadata: SegmentMetadata,
}

impl Segment {
    /// Create a segment; callers normally get segments from the chunker
    pub fn new(content: String, source: &str, chunk_index: u32, source_kind: FileType) -> Self {
        Self {
            content,
            metadata: SegmentMetadata {
                source: source.to_string(),
                chunk_index,
                source_kind,
            },
        }
    }

    /// Format the segment's origin for display
    pub fn format_citation(&self) -> String {
        format!(
            "{} ({}, chunk {})",
            self.metadata.source,
            self.metadata.source_kind.display_name(),
            self.metadata.chunk_index
        )
    }
}
