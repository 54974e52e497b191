//! API routes for the RAG server

pub mod ingest;
pub mod query;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;
use crate::session::SessionStatus;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Ingestion - with larger body limit for file uploads
        .route(
            "/ingest",
            post(ingest::ingest_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Query
        .route("/query", post(query::query_documents))
        // Session management
        .route("/status", get(status))
        .route("/reset", post(reset))
        // Info
        .route("/info", get(info))
}

/// GET /api/status - Documents processed, chunk count and models in use
async fn status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.session().read().await.status().await)
}

/// POST /api/reset - Drop all documents and the index
async fn reset(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.reset().await;
    Json(serde_json::json!({ "success": true }))
}

/// API info endpoint
async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "docqa-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document Q&A over PDF, DOCX and TXT files with cited sources",
        "endpoints": {
            "POST /api/ingest": "Upload and process documents (multipart)",
            "POST /api/query": "Ask a question about the processed documents",
            "GET /api/status": "Session status",
            "POST /api/reset": "Clear all documents",
            "GET /api/info": "This document"
        },
        "supported_file_types": ["pdf", "docx", "txt"]
    }))
}
