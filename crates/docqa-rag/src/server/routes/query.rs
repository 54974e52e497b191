//! Query endpoint with RAG and citations

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /api/query - Answer a question from the processed documents
///
/// Retrieval and generation failures still return 200 with a degraded
/// response; only precondition failures become HTTP errors.
pub async fn query_documents(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    tracing::info!("Query: \"{}\"", request.question);

    let response = match state.session().read().await.query_request(&request).await {
        Ok(response) => response,
        Err(e) if e.is_precondition() => {
            tracing::warn!("Query rejected: {}", e);
            return Err(e);
        }
        Err(e) => {
            tracing::error!("Query failed: {}", e);
            return Err(e);
        }
    };

    tracing::info!(
        "Answered with {} sources ({:?}) in {}ms",
        response.sources.len(),
        response.outcome,
        response.processing_time_ms
    );

    Ok(Json(response))
}
