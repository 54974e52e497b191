//! Provider abstractions for embeddings, answer generation and similarity search
//!
//! The pipeline only sees the traits; concrete backends are injected as
//! `Arc<dyn Trait>`.

pub mod embedding;
pub mod gemini;
pub mod llm;
pub mod ollama;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use gemini::GeminiClient;
pub use llm::AnswerGenerator;
pub use ollama::OllamaEmbedder;
pub use vector_store::SimilarityIndex;
