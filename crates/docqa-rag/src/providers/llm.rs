//! Answer generator trait

use async_trait::async_trait;
use crate::error::Result;

/// Trait for prompt-in, text-out answer generation
///
/// An implementation may return an empty string; callers treat that as a
/// failed generation rather than an answer.
///
/// Implementations:
/// - `GeminiClient`: Google Generative Language API (gemini-2.5-flash)
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate text for a fully built prompt
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
