//! Gemini client for answer generation via the Generative Language API

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{LlmConfig, API_KEY_PLACEHOLDER};
use crate::error::{Error, Result};

use super::llm::AnswerGenerator;

/// Gemini client authenticated with an API key
pub struct GeminiClient {
    client: Client,
    api_key: String,
    config: LlmConfig,
}

impl GeminiClient {
    /// Create a client from configuration
    ///
    /// Uses `llm.api_key`, then `GEMINI_API_KEY`. A missing key or the sample
    /// placeholder is a configuration error.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = resolve_api_key(
            config.api_key.as_deref(),
            std::env::var("GEMINI_API_KEY").ok(),
        )?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        tracing::info!("Gemini client initialized with model {}", config.model);

        Ok(Self {
            client,
            api_key,
            config: config.clone(),
        })
    }

    /// Get the API endpoint URL for `method` on the configured model
    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/models/{}{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            method
        )
    }

    async fn generate_once(&self, request: &GenerateRequest<'_>) -> std::result::Result<String, Attempt> {
        let response = self
            .client
            .post(self.endpoint(":generateContent"))
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| Attempt::retry(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = format!("Gemini generation failed ({}): {}", status, body);
            return Err(if is_retryable_status(status) {
                Attempt::retry(message)
            } else {
                Attempt::fatal(message)
            });
        }

        let gen_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Attempt::retry(format!("Failed to parse Gemini response: {}", e)))?;

        // A blocked or empty candidate comes back as empty text
        Ok(gen_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

/// A failed request and whether sending it again can succeed
struct Attempt {
    error: Error,
    retryable: bool,
}

impl Attempt {
    fn retry(message: String) -> Self {
        Self {
            error: Error::llm(message),
            retryable: true,
        }
    }

    fn fatal(message: String) -> Self {
        Self {
            error: Error::llm(message),
            retryable: false,
        }
    }
}

/// Rate limits and server errors are transient; other 4xx are not
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Pick the configured key, falling back to the environment value
fn resolve_api_key(configured: Option<&str>, from_env: Option<String>) -> Result<String> {
    let usable = |key: &str| {
        let key = key.trim();
        !key.is_empty() && key != API_KEY_PLACEHOLDER
    };

    if let Some(key) = configured.filter(|k| usable(k)) {
        return Ok(key.trim().to_string());
    }
    if let Some(key) = from_env.filter(|k| usable(k)) {
        return Ok(key.trim().to_string());
    }

    Err(Error::config(
        "Gemini API key not found. Set GEMINI_API_KEY or llm.api_key.",
    ))
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[async_trait]
impl AnswerGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
            },
        };

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            match self.generate_once(&request).await {
                Ok(text) => return Ok(text),
                Err(Attempt { error, retryable: false }) => {
                    tracing::error!("Gemini rejected the request: {}", error);
                    return Err(error);
                }
                Err(Attempt { error, .. }) => {
                    last_error = Some(error);
                    if attempt < self.config.max_retries {
                        let delay = self.config.retry_delay(attempt);
                        tracing::warn!(
                            "Gemini request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.config.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::llm("Unknown error")))
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(self.endpoint(""))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("Gemini connection test failed: {}", e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
