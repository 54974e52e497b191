//! Document ingestion endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingestion::FileParser;
use crate::server::state::AppState;
use crate::types::{IngestError, IngestResponse, SourceDocument};

/// POST /api/ingest - Upload and process files
///
/// Files that fail to parse are reported in `errors` and the rest of the
/// batch is still ingested.
pub async fn ingest_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();
    let mut sources = Vec::new();
    let mut errors = Vec::new();
    let parse_timeout = Duration::from_secs(state.config().server.parse_timeout_secs);

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        Error::internal(format!("Failed to read multipart field: {}", e))
    })? {
        // Get filename
        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("file_{}.bin", Uuid::new_v4()));

        // Read file content
        let data = match field.bytes().await {
            Ok(d) => d,
            Err(e) => {
                errors.push(IngestError {
                    filename: filename.clone(),
                    error: format!("Failed to read file: {}", e),
                });
                continue;
            }
        };

        tracing::info!("Processing file: {} ({} bytes)", filename, data.len());

        match parse_with_timeout(&filename, data.to_vec(), parse_timeout).await {
            Ok(source) => sources.push(source),
            Err(e) => {
                tracing::error!("Failed to process {}: {}", filename, e);
                errors.push(IngestError {
                    filename,
                    error: e.to_string(),
                });
            }
        }
    }

    if sources.is_empty() && errors.is_empty() {
        return Err(Error::InvalidQuery("no files were uploaded".to_string()));
    }

    let documents = state.ingest(&sources).await?;

    for doc in documents.iter().filter(|d| !d.duplicate && d.total_chunks == 0) {
        errors.push(IngestError {
            filename: doc.filename.clone(),
            error: "No text could be extracted from this file".to_string(),
        });
    }

    let total_chunks_created = documents.iter().map(|d| d.total_chunks).sum();
    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        "Ingested {} files ({} chunks, {} errors) in {}ms",
        documents.len(),
        total_chunks_created,
        errors.len(),
        processing_time_ms
    );

    Ok(Json(IngestResponse {
        success: total_chunks_created > 0,
        documents,
        total_chunks_created,
        processing_time_ms,
        errors,
    }))
}

/// Extract text off the async runtime, bounded by `limit`
async fn parse_with_timeout(filename: &str, data: Vec<u8>, limit: Duration) -> Result<SourceDocument> {
    let name = filename.to_string();
    let task = tokio::task::spawn_blocking(move || {
        FileParser::parse(&name, &data).map(|parsed| {
            if let Some(pages) = parsed.total_pages {
                tracing::debug!("Extracted {} pages from {}", pages, name);
            }
            parsed.into_source_document(name.as_str())
        })
    });

    match timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(Error::file_parse(
            filename,
            format!("parser task failed: {}", join_error),
        )),
        Err(_) => Err(Error::file_parse(
            filename,
            format!("extraction timed out after {}s", limit.as_secs()),
        )),
    }
}
