//! Exhaustive in-memory similarity index

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, SimilarityIndex};
use crate::types::{RetrievalHit, Segment};

/// A stored segment with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    segment: Segment,
    embedding: Vec<f32>,
}

/// On-disk snapshot format
#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    embedder: String,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

/// Cosine-similarity index over segments embedded by an `EmbeddingProvider`
///
/// Readers see a consistent snapshot: `search` scores under a read lock and
/// inserts only take the write lock once embedding has finished.
pub struct InMemoryIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    entries: RwLock<Vec<IndexEntry>>,
}

impl InMemoryIndex {
    /// Create an empty index
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Create an index and insert `segments`
    pub async fn from_segments(
        embedder: Arc<dyn EmbeddingProvider>,
        segments: Vec<Segment>,
    ) -> Result<Self> {
        let index = Self::new(embedder);
        index.add_segments(segments).await?;
        Ok(index)
    }

    /// Write all segments and embeddings as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let entries = self.entries.read();
        let snapshot = IndexSnapshot {
            embedder: self.embedder.name().to_string(),
            dimensions: entries.first().map(|e| e.embedding.len()).unwrap_or(0),
            entries: entries.clone(),
        };
        drop(entries);

        let json = serde_json::to_string(&snapshot)?;
        std::fs::write(path, json)?;

        tracing::info!(
            "Saved index with {} segments to {}",
            snapshot.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Load a snapshot written by `save`
    pub fn load(path: impl AsRef<Path>, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let snapshot: IndexSnapshot = serde_json::from_str(&raw)?;

        if snapshot
            .entries
            .iter()
            .any(|e| e.embedding.len() != snapshot.dimensions)
        {
            return Err(Error::vector_db(format!(
                "{}: snapshot contains embeddings of mixed dimensions",
                path.display()
            )));
        }
        if snapshot.embedder != embedder.name() {
            tracing::warn!(
                "Index snapshot was built with '{}', loading with '{}'",
                snapshot.embedder,
                embedder.name()
            );
        }

        tracing::info!(
            "Loaded index with {} segments from {}",
            snapshot.entries.len(),
            path.display()
        );

        Ok(Self {
            embedder,
            entries: RwLock::new(snapshot.entries),
        })
    }
}

#[async_trait]
impl SimilarityIndex for InMemoryIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievalHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let entries = self.entries.read();
        let mut scored: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.embedding.len() == query_embedding.len())
            .map(|(i, e)| (i, cosine_similarity(&query_embedding, &e.embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| RetrievalHit::from_segment(&entries[i].segment, score))
            .collect())
    }

    async fn add_segments(&self, segments: Vec<Segment>) -> Result<usize> {
        if segments.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = segments.iter().map(|s| s.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != segments.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                segments.len(),
                embeddings.len()
            )));
        }

        let mut entries = self.entries.write();
        let expected = entries
            .first()
            .map(|e| e.embedding.len())
            .or_else(|| embeddings.first().map(Vec::len))
            .unwrap_or(0);
        if let Some(bad) = embeddings.iter().find(|e| e.len() != expected) {
            return Err(Error::vector_db(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                expected,
                bad.len()
            )));
        }

        let added = segments.len();
        entries.extend(
            segments
                .into_iter()
                .zip(embeddings)
                .map(|(segment, embedding)| IndexEntry { segment, embedding }),
        );

        tracing::debug!("Index now holds {} segments", entries.len());
        Ok(added)
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().len())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

/// Cosine similarity; 0.0 when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileType;

    /// Bag-of-words embedder: each word bumps one of 32 buckets
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut v = vec![0.0; 32];
            for word in text.split_whitespace() {
                let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
                if word.is_empty() {
                    continue;
                }
                let bucket = word.bytes().map(|b| b as usize).sum::<usize>() % 32;
                v[bucket] += 1.0;
            }
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            32
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    fn segments() -> Vec<Segment> {
        vec![
            Segment::new("rust ownership borrowing".to_string(), "rust.txt", 0, FileType::Txt),
            Segment::new("python garbage collection".to_string(), "python.txt", 0, FileType::Txt),
            Segment::new("rust lifetimes".to_string(), "rust.txt", 1, FileType::Txt),
        ]
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let index = InMemoryIndex::from_segments(Arc::new(KeywordEmbedder), segments())
            .await
            .unwrap();

        let hits = index.search("rust ownership", 2).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "rust ownership borrowing");
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(index.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_search_zero_k_and_empty_index() {
        let index = InMemoryIndex::new(Arc::new(KeywordEmbedder));
        assert!(index.search("anything", 4).await.unwrap().is_empty());
        assert!(index.is_empty().await.unwrap());

        index.add_segments(segments()).await.unwrap();
        assert!(index.search("rust", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_incremental_add() {
        let index = InMemoryIndex::new(Arc::new(KeywordEmbedder));
        assert_eq!(index.add_segments(segments()).await.unwrap(), 3);
        assert_eq!(index.add_segments(Vec::new()).await.unwrap(), 0);

        let extra = vec![Segment::new("tokio runtime".to_string(), "async.txt", 0, FileType::Txt)];
        assert_eq!(index.add_segments(extra).await.unwrap(), 1);
        assert_eq!(index.len().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_save_and_load_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index").join("snapshot.json");

        let index = InMemoryIndex::from_segments(Arc::new(KeywordEmbedder), segments())
            .await
            .unwrap();
        index.save(&path).unwrap();

        let restored = InMemoryIndex::load(&path, Arc::new(KeywordEmbedder)).unwrap();
        assert_eq!(restored.len().await.unwrap(), 3);

        let before = index.search("garbage collection", 1).await.unwrap();
        let after = restored.search("garbage collection", 1).await.unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_load_missing_file() {
        let result = InMemoryIndex::load("/nonexistent/snapshot.json", Arc::new(KeywordEmbedder));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
