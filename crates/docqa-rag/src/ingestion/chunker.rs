//! Text chunking with sentence and word boundary awareness
//!
//! All positions are counted in `char`s so a cut never lands inside a
//! multi-byte code point.

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Segment, SourceDocument};

/// Characters that end a sentence
const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; requires `chunk_size > 0` and `overlap < chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than 0"));
        }
        if overlap >= chunk_size {
            return Err(Error::config(format!(
                "overlap ({}) must be smaller than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into trimmed, non-empty, overlapping chunks
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();

        if chars.len() <= self.chunk_size {
            let trimmed = text.trim();
            return if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![trimmed.to_string()]
            };
        }

        self.spans(&chars)
            .into_iter()
            .filter_map(|(start, end)| {
                let piece: String = chars[start..end].iter().collect();
                let trimmed = piece.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect()
    }

    /// Chunk a source document into segments with contiguous chunk indices
    pub fn chunk_document(&self, doc: &SourceDocument) -> Vec<Segment> {
        let segments: Vec<Segment> = self
            .chunk(&doc.raw_text)
            .into_iter()
            .enumerate()
            .map(|(i, content)| Segment::new(content, &doc.source_name, i as u32, doc.file_kind))
            .collect();

        tracing::debug!(
            "Chunked {} ({} chars) into {} segments",
            doc.source_name,
            doc.raw_text.chars().count(),
            segments.len()
        );

        segments
    }

    /// Untrimmed `[start, end)` windows over `chars`
    ///
    /// Consecutive windows overlap by exactly `overlap` characters, the first
    /// starts at 0 and the last ends at `chars.len()`.
    pub(crate) fn spans(&self, chars: &[char]) -> Vec<(usize, usize)> {
        let len = chars.len();
        let mut spans = Vec::new();
        let mut start = 0usize;

        while start < len {
            let window_end = (start + self.chunk_size).min(len);
            let end = if window_end < len {
                self.find_cut(chars, start, window_end)
            } else {
                window_end
            };

            spans.push((start, end));

            if end >= len {
                break;
            }

            // find_cut guarantees end > start + overlap
            let next = end - self.overlap;
            debug_assert!(next > start);
            start = next;
        }

        spans
    }

    /// Pick the cut point for the window `[start, end)`
    ///
    /// Prefers just after the last sentence terminator, then the last space,
    /// then the raw window end. A boundary is only accepted if the next
    /// window would still start after `start`.
    fn find_cut(&self, chars: &[char], start: usize, end: usize) -> usize {
        // A cut at or before start + overlap moves the next window back to or
        // before `start`, e.g. "Hello world." with an overlap above 12, and the
        // same window repeats forever.
        let min_cut = start + self.overlap;

        let last_terminator = (start..end)
            .rev()
            .find(|&i| SENTENCE_TERMINATORS.contains(&chars[i]));
        if let Some(pos) = last_terminator {
            if pos > start && pos + 1 > min_cut {
                return pos + 1;
            }
        }

        let last_space = (start..end).rev().find(|&i| chars[i] == ' ');
        if let Some(pos) = last_space {
            if pos > start && pos > min_cut {
                return pos;
            }
        }

        end
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        let config = ChunkingConfig::default();
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileType;

    fn rebuild(chars: &[char], spans: &[(usize, usize)], overlap: usize) -> String {
        let mut out = String::new();
        for (i, &(start, end)) in spans.iter().enumerate() {
            let from = if i == 0 { start } else { start + overlap };
            out.extend(&chars[from..end]);
        }
        out
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(TextChunker::new(0, 0), Err(Error::Config(_))));
        assert!(matches!(TextChunker::new(100, 100), Err(Error::Config(_))));
        assert!(matches!(TextChunker::new(100, 150), Err(Error::Config(_))));
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_short_text_single_stripped_chunk() {
        let chunker = TextChunker::new(100, 20).unwrap();
        assert_eq!(chunker.chunk("  short text  \n"), vec!["short text".to_string()]);
    }

    #[test]
    fn test_blank_text_yields_nothing() {
        let chunker = TextChunker::new(100, 20).unwrap();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\t  ").is_empty());
    }

    #[test]
    fn test_hard_cuts_advance_by_step() {
        let chunker = TextChunker::new(100, 20).unwrap();
        let text: String = (0..250).map(|i| (b'a' + (i % 26) as u8) as char).collect();

        let chunks = chunker.chunk(&text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], &text[0..100]);
        assert_eq!(chunks[1], &text[80..180]);
        assert_eq!(chunks[2], &text[160..250]);
    }

    #[test]
    fn test_prefers_sentence_boundary() {
        let chunker = TextChunker::new(20, 5).unwrap();
        let chunks = chunker.chunk("Hello world. This is a test sentence that continues on.");

        assert_eq!(chunks[0], "Hello world.");
    }

    #[test]
    fn test_falls_back_to_space() {
        let chunker = TextChunker::new(12, 2).unwrap();
        let chunks = chunker.chunk("alpha beta gamma delta epsilon");

        assert_eq!(chunks[0], "alpha beta");
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
    }

    #[test]
    fn test_spans_reconstruct_text() {
        let chunker = TextChunker::new(40, 10).unwrap();
        let text = "Rust is a language. It has ownership! Does it have a borrow checker? \
                    Yes it does and it is strict about aliasing and mutation rules everywhere.";
        let chars: Vec<char> = text.chars().collect();

        let spans = chunker.spans(&chars);

        assert_eq!(spans.first().unwrap().0, 0);
        assert_eq!(spans.last().unwrap().1, chars.len());
        for pair in spans.windows(2) {
            assert_eq!(pair[1].0, pair[0].1 - 10);
            assert!(pair[1].0 > pair[0].0);
        }
        assert_eq!(rebuild(&chars, &spans, 10), text);
    }

    #[test]
    fn test_boundary_near_start_does_not_stall() {
        // Terminator right after `start` would step backwards without the guard.
        let chunker = TextChunker::new(10, 8).unwrap();
        let text = "a.bcdefghijklmnopqrstuvwxyz.abcdefghijklmnop";
        let chars: Vec<char> = text.chars().collect();

        let spans = chunker.spans(&chars);

        assert_eq!(spans.last().unwrap().1, chars.len());
        for pair in spans.windows(2) {
            assert!(pair[1].0 > pair[0].0);
        }
        assert_eq!(rebuild(&chars, &spans, 8), text);
    }

    #[test]
    fn test_short_sentence_with_large_overlap_terminates() {
        let chunker = TextChunker::new(20, 15).unwrap();
        let text = "Hello world. This text keeps going well past the first window.";
        let chars: Vec<char> = text.chars().collect();

        let spans = chunker.spans(&chars);

        assert_eq!(spans.last().unwrap().1, chars.len());
        for pair in spans.windows(2) {
            assert!(pair[1].0 > pair[0].0);
        }
    }

    #[test]
    fn test_multibyte_text_is_cut_on_chars() {
        let chunker = TextChunker::new(10, 2).unwrap();
        let text = "ééééééééééééééééééééééééé";

        let chunks = chunker.chunk(text);

        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_chunk_document_indices_are_contiguous() {
        let chunker = TextChunker::new(30, 5).unwrap();
        let doc = SourceDocument::new(
            "guide.txt",
            FileType::Txt,
            "First sentence here. Second sentence follows. Third one closes it out.",
        );

        let segments = chunker.chunk_document(&doc);

        assert!(segments.len() > 1);
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.metadata.chunk_index, i as u32);
            assert_eq!(segment.metadata.source, "guide.txt");
            assert_eq!(segment.metadata.source_kind, FileType::Txt);
            assert!(!segment.content.trim().is_empty());
        }
    }
}
