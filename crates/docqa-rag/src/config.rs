//! Configuration for the document Q&A system

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::SOURCE_PREVIEW_CHARS;

/// Placeholder value shipped in sample `.env` files; treated as "no key"
pub const API_KEY_PLACEHOLDER: &str = "your_gemini_api_key_here";

/// Main RAG system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Retrieval and context assembly configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Answer generation (Gemini) configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embedding (Ollama) configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config: RagConfig = toml::from_str(&raw)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from `DOCQA_CONFIG` if set, otherwise defaults plus environment overrides
    pub fn load() -> Result<Self> {
        match std::env::var("DOCQA_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path),
            _ => {
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Apply `GEMINI_API_KEY`, `GEMINI_MODEL` and `OLLAMA_BASE_URL`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.trim().is_empty() {
                self.llm.model = model;
            }
        }
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            if !url.trim().is_empty() {
                self.embeddings.base_url = url;
            }
        }
    }

    /// Reject parameter combinations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;

        if self.retrieval.max_context_length == 0 {
            return Err(Error::config("retrieval.max_context_length must be greater than 0"));
        }
        if self.retrieval.num_sources == 0 {
            return Err(Error::config("retrieval.num_sources must be greater than 0"));
        }
        if !(1..=SOURCE_PREVIEW_CHARS).contains(&self.retrieval.source_preview_chars) {
            return Err(Error::config(format!(
                "retrieval.source_preview_chars must be within [1, {}], got {}",
                SOURCE_PREVIEW_CHARS, self.retrieval.source_preview_chars
            )));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::config(format!(
                "llm.temperature must be within [0, 2], got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(Error::config("llm.max_tokens must be greater than 0"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::config("llm.timeout_secs must be greater than 0"));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
    /// Per-file text extraction timeout in seconds
    pub parse_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024, // 50MB
            parse_timeout_secs: 120,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    /// `chunk_size > 0` and `chunk_overlap < chunk_size`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Retrieval and context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of passages retrieved per question
    pub num_sources: usize,
    /// Character budget for the assembled context window
    pub max_context_length: usize,
    /// Characters of each source shown back to the caller (at most 500)
    pub source_preview_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            num_sources: 4,
            max_context_length: 4000,
            source_preview_chars: SOURCE_PREVIEW_CHARS,
        }
    }
}

/// Gemini generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key; falls back to `GEMINI_API_KEY`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Generation model name
    pub model: String,
    /// Generative Language API base URL
    pub base_url: String,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Timeout for a single request in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

impl LlmConfig {
    /// Backoff before retry number `attempt + 1`: 1s, 2s, 4s, ...
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(2u64.saturating_pow(attempt))
    }

    /// Upper bound for one generation call including every retry
    ///
    /// Each attempt gets `timeout_secs`, plus the backoff between attempts
    /// and one second for connection setup.
    pub fn generation_budget(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let backoff = (0..self.max_retries)
            .map(|attempt| self.retry_delay(attempt))
            .fold(Duration::ZERO, Duration::saturating_add);

        Duration::from_secs(self.timeout_secs)
            .saturating_mul(attempts)
            .saturating_add(backoff)
            .saturating_add(Duration::from_secs(1))
    }
}

/// Ollama embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}
