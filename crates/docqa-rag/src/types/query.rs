//! Query request types

use serde::{Deserialize, Serialize};

/// Query request for RAG search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,

    /// Number of passages to retrieve (defaults to `retrieval.num_sources`)
    #[serde(default)]
    pub num_sources: Option<usize>,

    /// Earlier conversation turns, oldest first
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            num_sources: None,
            history: Vec::new(),
        }
    }

    /// Set the number of passages to retrieve
    pub fn with_num_sources(mut self, k: usize) -> Self {
        self.num_sources = Some(k);
        self
    }

    /// Attach conversation history
    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.history = history;
        self
    }
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Label used when rendering history into a prompt
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "Human",
            Self::Assistant => "Assistant",
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_from_json() {
        let request: QueryRequest = serde_json::from_str(r#"{"question": "What is RAG?"}"#).unwrap();
        assert_eq!(request.question, "What is RAG?");
        assert!(request.num_sources.is_none());
        assert!(request.history.is_empty());
    }

    #[test]
    fn test_history_roles_parse() {
        let request: QueryRequest = serde_json::from_str(
            r#"{"question": "and then?", "num_sources": 2,
                "history": [{"role": "user", "content": "hi"}, {"role": "assistant", "content": "hello"}]}"#,
        )
        .unwrap();
        assert_eq!(request.num_sources, Some(2));
        assert_eq!(request.history[1].role, ChatRole::Assistant);
    }
}
