//! Text extraction for PDF, DOCX and TXT uploads

use crate::error::{Error, Result};
use crate::types::{FileType, SourceDocument};

/// Parsed document with extracted text
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Extracted text content
    pub content: String,
    /// Total pages (PDF only)
    pub total_pages: Option<u32>,
}

impl ParsedDocument {
    /// Hand the extracted text to ingestion under `source_name`
    pub fn into_source_document(self, source_name: impl Into<String>) -> SourceDocument {
        SourceDocument::new(source_name, self.file_type, self.content)
    }
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let file_type = FileType::from_filename(filename).ok_or_else(|| {
            let ext = filename.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
            Error::UnsupportedFileType(format!("'{}' (expected pdf, docx or txt)", ext))
        })?;

        let parsed = match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data)?,
            FileType::Docx => Self::parse_docx(filename, data)?,
            FileType::Txt => Self::parse_text(data),
        };

        if parsed.content.trim().is_empty() {
            tracing::warn!("No text extracted from {}", filename);
        }

        Ok(parsed)
    }

    /// Parse PDF document, marking page starts with `--- Page N ---`
    #[cfg(feature = "pdf")]
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let raw = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Error reading PDF: {}", e)))?;
        let raw = raw.replace('\0', "");

        // pdf-extract separates pages with form feeds
        let mut content = String::new();
        let mut total_pages = 0u32;
        for (i, page) in raw.split('\u{c}').enumerate() {
            if page.trim().is_empty() {
                continue;
            }
            total_pages += 1;
            content.push_str(&format!("\n--- Page {} ---\n{}\n", i + 1, page.trim()));
        }

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            content,
            total_pages: Some(total_pages),
        })
    }

    #[cfg(not(feature = "pdf"))]
    fn parse_pdf(_filename: &str, _data: &[u8]) -> Result<ParsedDocument> {
        Err(Error::UnsupportedFileType("pdf (built without the `pdf` feature)".to_string()))
    }

    /// Parse DOCX document: paragraphs first, then table cells row by row
    #[cfg(feature = "docx")]
    fn parse_docx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = docx_rs::read_docx(data)
            .map_err(|e| Error::file_parse(filename, format!("Error reading DOCX: {}", e)))?;

        let mut paragraphs = String::new();
        let mut tables = String::new();

        for child in &doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => {
                    let text = paragraph_text(p);
                    if !text.trim().is_empty() {
                        paragraphs.push_str(&text);
                        paragraphs.push('\n');
                    }
                }
                docx_rs::DocumentChild::Table(table) => {
                    for row in &table.rows {
                        #[allow(irrefutable_let_patterns)]
                        if let docx_rs::TableChild::TableRow(row) = row {
                            for cell in &row.cells {
                                #[allow(irrefutable_let_patterns)]
                                if let docx_rs::TableRowChild::TableCell(cell) = cell {
                                    let text = cell_text(cell);
                                    if !text.trim().is_empty() {
                                        tables.push_str(&text);
                                        tables.push(' ');
                                    }
                                }
                            }
                        }
                        tables.push('\n');
                    }
                }
                _ => {}
            }
        }

        paragraphs.push_str(&tables);

        Ok(ParsedDocument {
            file_type: FileType::Docx,
            content: paragraphs,
            total_pages: None,
        })
    }

    #[cfg(not(feature = "docx"))]
    fn parse_docx(_filename: &str, _data: &[u8]) -> Result<ParsedDocument> {
        Err(Error::UnsupportedFileType("docx (built without the `docx` feature)".to_string()))
    }

    /// Parse plain text: UTF-8 first, Latin-1 otherwise
    fn parse_text(data: &[u8]) -> ParsedDocument {
        let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
        let content = match std::str::from_utf8(data) {
            Ok(text) => text.to_string(),
            Err(_) => {
                tracing::debug!("Text file is not valid UTF-8, decoding as Latin-1");
                data.iter().map(|&b| b as char).collect()
            }
        };

        ParsedDocument {
            file_type: FileType::Txt,
            content,
            total_pages: None,
        }
    }
}

#[cfg(feature = "docx")]
fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for child in &run.children {
                if let docx_rs::RunChild::Text(t) = child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

#[cfg(feature = "docx")]
fn cell_text(cell: &docx_rs::TableCell) -> String {
    cell.children
        .iter()
        .filter_map(|content| match content {
            docx_rs::TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_text() {
        let parsed = FileParser::parse("notes.txt", "Café au lait.".as_bytes()).unwrap();
        assert_eq!(parsed.file_type, FileType::Txt);
        assert_eq!(parsed.content, "Café au lait.");
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut data = vec![0xEF, 0xBB, 0xBF];
        data.extend_from_slice(b"hello");
        let parsed = FileParser::parse("bom.txt", &data).unwrap();
        assert_eq!(parsed.content, "hello");
    }

    #[test]
    fn test_latin1_fallback() {
        // "café" in Latin-1; 0xE9 alone is invalid UTF-8
        let parsed = FileParser::parse("legacy.txt", &[b'c', b'a', b'f', 0xE9]).unwrap();
        assert_eq!(parsed.content, "café");
    }

    #[test]
    fn test_unsupported_extension() {
        let result = FileParser::parse("slides.pptx", b"PK");
        assert!(matches!(result, Err(Error::UnsupportedFileType(_))));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_garbage_pdf_is_parse_error() {
        let result = FileParser::parse("broken.pdf", b"not a pdf at all");
        assert!(matches!(result, Err(Error::FileParse { .. })));
    }

    #[cfg(feature = "docx")]
    #[test]
    fn test_garbage_docx_is_parse_error() {
        let result = FileParser::parse("broken.docx", b"not a zip archive");
        assert!(matches!(result, Err(Error::FileParse { .. })));
    }

    #[test]
    fn test_into_source_document() {
        let doc = FileParser::parse("a.txt", b"text body")
            .unwrap()
            .into_source_document("a.txt");
        assert_eq!(doc.source_name, "a.txt");
        assert_eq!(doc.file_kind, FileType::Txt);
        assert_eq!(doc.raw_text, "text body");
    }
}
