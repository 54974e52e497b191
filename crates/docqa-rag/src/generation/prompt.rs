//! Prompt templates for grounded answer generation

use crate::types::ChatTurn;

/// Number of earlier turns carried into a conversational prompt
pub const HISTORY_TURNS: usize = 5;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Build the grounded-answer prompt from an assembled context
    pub fn build_rag_prompt(question: &str, context: &str) -> String {
        format!(
            r#"Based on the following context from uploaded documents, please answer the user's question.
If the context doesn't contain enough information to answer the question, please say so clearly.

Context:
{context}

Question: {question}

Instructions:
- Provide a clear, accurate, and helpful answer based on the context
- If information is incomplete or unclear, mention this
- Reference specific sources when possible, using their [Source N] labels
- If the context doesn't contain relevant information, state this clearly
- Be conversational but informative

Answer:"#,
            context = context,
            question = question
        )
    }

    /// Fold the last few conversation turns into the question
    ///
    /// Returns `question` unchanged when there is no history.
    pub fn build_chat_prompt(history: &[ChatTurn], question: &str) -> String {
        if history.is_empty() {
            return question.to_string();
        }

        let recent = &history[history.len().saturating_sub(HISTORY_TURNS)..];
        let conversation = recent
            .iter()
            .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Previous conversation:\n{}\n\nCurrent question: {}",
            conversation, question
        )
    }
}
