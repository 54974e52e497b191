//! Query orchestration: retrieve, assemble, generate, format
//!
//! `RagPipeline::query` always returns a `QueryResponse`. Retrieval and
//! generation failures become degraded responses with an explanatory answer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{LlmConfig, RagConfig, RetrievalConfig};
use crate::generation::{extract_cited_sources, ContextAssembler, PromptBuilder};
use crate::providers::{AnswerGenerator, SimilarityIndex};
use crate::types::{ChatTurn, QueryOutcome, QueryResponse, RetrievalHit, SourceRecord};

/// Answer used when the generator returns blank text
pub const EMPTY_ANSWER_APOLOGY: &str = "I was unable to generate an answer to your question. \
Please try rephrasing your question or check if your documents contain relevant information.";

/// Retrieval-augmented query pipeline over an index and a generator
pub struct RagPipeline {
    index: Arc<dyn SimilarityIndex>,
    generator: Arc<dyn AnswerGenerator>,
    assembler: ContextAssembler,
    retrieval: RetrievalConfig,
    llm: LlmConfig,
}

impl RagPipeline {
    /// Create a pipeline from its collaborators and configuration
    pub fn new(
        index: Arc<dyn SimilarityIndex>,
        generator: Arc<dyn AnswerGenerator>,
        config: &RagConfig,
    ) -> Self {
        Self {
            index,
            generator,
            assembler: ContextAssembler::new(config.retrieval.max_context_length),
            retrieval: config.retrieval.clone(),
            llm: config.llm.clone(),
        }
    }

    pub fn index(&self) -> &Arc<dyn SimilarityIndex> {
        &self.index
    }

    pub fn generator(&self) -> &Arc<dyn AnswerGenerator> {
        &self.generator
    }

    /// Answer `question` from the top `num_sources` passages
    pub async fn query(&self, question: &str, num_sources: usize) -> QueryResponse {
        self.run(question, question, num_sources).await
    }

    /// Answer a follow-up question in the context of earlier turns
    ///
    /// Retrieval uses the raw question; the generator sees the conversation.
    pub async fn query_with_history(
        &self,
        question: &str,
        history: &[ChatTurn],
        num_sources: usize,
    ) -> QueryResponse {
        let contextual = PromptBuilder::build_chat_prompt(history, question);
        self.run(question, &contextual, num_sources).await
    }

    async fn run(&self, retrieval_query: &str, question: &str, num_sources: usize) -> QueryResponse {
        let start = Instant::now();
        let response = self.answer(retrieval_query, question, num_sources).await;
        let elapsed = start.elapsed().as_millis() as u64;

        if response.degraded {
            tracing::warn!("Query finished degraded ({:?}) in {}ms", response.outcome, elapsed);
        } else {
            tracing::info!("Query finished ({:?}) in {}ms", response.outcome, elapsed);
        }

        response.with_processing_time(elapsed)
    }

    async fn answer(&self, retrieval_query: &str, question: &str, num_sources: usize) -> QueryResponse {
        // Step 1: Retrieve
        tracing::info!("Step 1: Retrieving {} passages", num_sources);
        let mut hits = match self.index.search(retrieval_query, num_sources).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::error!("Retrieval failed on {}: {}", self.index.name(), e);
                return QueryResponse::retrieval_failed(&e.to_string());
            }
        };

        // Step 2: Rank, most similar first
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));

        // Step 3: Nothing relevant
        if hits.is_empty() {
            tracing::info!("No passages retrieved");
            return QueryResponse::not_found();
        }

        // Step 4: Assemble a bounded context
        let (context, used) = self.assembler.assemble(&hits);
        tracing::info!("Step 2: Assembled context from {} of {} passages", used, hits.len());
        if used == 0 {
            return QueryResponse::new(
                format!(
                    "The most relevant passage is longer than the context window \
                     ({} characters). Increase retrieval.max_context_length or use a \
                     smaller chunk size.",
                    self.assembler.max_context_length()
                ),
                self.format_sources(&hits),
                QueryOutcome::ContextBudgetExceeded,
            );
        }

        // Step 5: Generate
        let prompt = PromptBuilder::build_rag_prompt(question, &context);
        tracing::info!(
            "Step 3: Generating answer with {} ({})",
            self.generator.name(),
            self.generator.model()
        );
        tracing::debug!("Prompt length: {} chars", prompt.chars().count());

        let generated = tokio::time::timeout(
            self.generation_timeout(),
            self.generator
                .generate(&prompt, self.llm.max_tokens, self.llm.temperature),
        )
        .await;

        let answer = match generated {
            Ok(Ok(answer)) if !answer.trim().is_empty() => answer,
            Ok(Ok(_)) => {
                tracing::warn!("Generator returned an empty answer");
                return QueryResponse::new(
                    EMPTY_ANSWER_APOLOGY.to_string(),
                    self.format_sources(&hits),
                    QueryOutcome::GenerationFailed,
                );
            }
            Ok(Err(e)) => {
                tracing::error!("Error generating answer: {}", e);
                return Self::generation_failed(&e.to_string(), self.format_sources(&hits));
            }
            Err(_) => {
                let detail = format!(
                    "generation timed out after {}s",
                    self.generation_timeout().as_secs()
                );
                tracing::error!("Error generating answer: {}", detail);
                return Self::generation_failed(&detail, self.format_sources(&hits));
            }
        };

        // Step 6: Format the sources actually used
        let sources = self.format_sources(&hits[..used]);
        let mut response = QueryResponse::new(answer, sources, QueryOutcome::Answered);
        response.cited_sources = extract_cited_sources(&response.answer, used);
        response
    }

    fn generation_failed(detail: &str, sources: Vec<SourceRecord>) -> QueryResponse {
        QueryResponse::new(
            format!("I encountered an error while generating an answer: {}", detail),
            sources,
            QueryOutcome::GenerationFailed,
        )
    }

    fn format_sources(&self, hits: &[RetrievalHit]) -> Vec<SourceRecord> {
        hits.iter()
            .map(|hit| SourceRecord::from_hit(hit, self.retrieval.source_preview_chars))
            .collect()
    }

    /// Leaves room for every retry the generator is configured to make
    fn generation_timeout(&self) -> Duration {
        self.llm.generation_budget()
    }
}
