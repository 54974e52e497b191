//! Document Q&A server binary
//!
//! Run with: cargo run -p docqa-rag --bin docqa-rag-server

use std::sync::Arc;

use docqa_rag::{
    config::RagConfig,
    providers::{AnswerGenerator, EmbeddingProvider, GeminiClient, OllamaEmbedder},
    server::{state::AppState, RagServer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                       DocQA RAG                           ║
║          Document Q&A with Source Citations               ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration (DOCQA_CONFIG, then environment overrides)
    let config = RagConfig::load()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!(
        "  - Chunk size: {} (overlap {})",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    // A missing API key stops startup here
    let generator = Arc::new(GeminiClient::from_config(&config.llm)?);
    let embedder = Arc::new(OllamaEmbedder::new(&config.embeddings)?);

    // Check Ollama
    tracing::info!("Checking Ollama at {}...", config.embeddings.base_url);
    if embedder.health_check().await? {
        tracing::info!("Ollama is running");
    } else {
        tracing::warn!("Ollama not available at {}", config.embeddings.base_url);
        tracing::warn!("Please start Ollama:");
        tracing::warn!("  1. Start: ollama serve");
        tracing::warn!("  2. Pull model: ollama pull {}", config.embeddings.model);
    }

    // Check Gemini
    if generator.health_check().await? {
        tracing::info!("Gemini API reachable ({})", generator.model());
    } else {
        tracing::warn!("Gemini API connection test failed; answers will degrade until it recovers");
    }

    // Create and start server
    let state = AppState::from_providers(config, embedder, generator)?;
    let server = RagServer::new(state);

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/ingest  - Upload documents");
    println!("  POST /api/query   - Ask questions");
    println!("  GET  /api/status  - Session status");
    println!("  POST /api/reset   - Clear documents");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
