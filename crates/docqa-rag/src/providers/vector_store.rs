//! Similarity index trait for storing and searching segments

use async_trait::async_trait;
use crate::error::Result;
use crate::types::{RetrievalHit, Segment};

/// Trait for nearest-neighbour search over embedded segments
///
/// `search` returns similarities, higher is more relevant. An index built on
/// a distance metric must convert before returning.
///
/// Implementations:
/// - `InMemoryIndex`: exhaustive cosine similarity over an `EmbeddingProvider`
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Return up to `k` hits for `query`
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>>;

    /// Embed and insert segments, returning how many were added
    async fn add_segments(&self, segments: Vec<Segment>) -> Result<usize>;

    /// Get total number of segments stored
    async fn len(&self) -> Result<usize>;

    /// Check if index is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}
