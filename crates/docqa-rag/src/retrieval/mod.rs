//! Similarity index implementations

pub mod index;

pub use index::{cosine_similarity, InMemoryIndex};
