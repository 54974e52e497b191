//! Application state for the RAG server

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::config::RagConfig;
use crate::error::Result;
use crate::providers::{AnswerGenerator, EmbeddingProvider};
use crate::session::RagSession;
use crate::types::{DocumentSummary, SourceDocument};

/// Shared application state
///
/// Queries take the session read lock. Ingestion embeds without holding any
/// session lock and takes the write lock only to commit. Ingestions and
/// resets are serialised by the ingest gate.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// The single session served by this process
    session: RwLock<RagSession>,
    /// Held across plan, embed and commit of one ingestion
    ingest_gate: Mutex<()>,
}

impl AppState {
    /// Wrap an existing session
    pub fn new(session: RagSession) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config: session.config().clone(),
                session: RwLock::new(session),
                ingest_gate: Mutex::new(()),
            }),
        }
    }

    /// Create state with a fresh session over the given providers
    pub fn from_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        tracing::info!(
            "Initializing application state (embedder: {}, generator: {} / {})",
            embedder.name(),
            generator.name(),
            generator.model()
        );
        Ok(Self::new(RagSession::new(config, embedder, generator)?))
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the session lock
    pub fn session(&self) -> &RwLock<RagSession> {
        &self.inner.session
    }

    /// Ingest documents without blocking queries during embedding
    pub async fn ingest(&self, documents: &[SourceDocument]) -> Result<Vec<DocumentSummary>> {
        let _gate = self.inner.ingest_gate.lock().await;

        let plan = self.inner.session.read().await.plan_ingest(documents);
        tracing::debug!("Embedding {} segments", plan.segment_count());
        let batch = plan.index_segments().await?;

        self.inner.session.write().await.commit_ingest(batch)
    }

    /// Reset the session once any running ingestion has committed
    pub async fn reset(&self) {
        let _gate = self.inner.ingest_gate.lock().await;
        self.inner.session.write().await.reset();
    }

    /// True once at least one document has been indexed
    pub async fn is_ready(&self) -> bool {
        self.inner.session.read().await.is_ready()
    }
}
