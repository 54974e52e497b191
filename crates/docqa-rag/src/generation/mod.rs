//! Context assembly, prompting and citation handling

pub mod citation;
pub mod context;
pub mod prompt;

pub use citation::{extract_cited_sources, truncate_content};
pub use context::ContextAssembler;
pub use prompt::PromptBuilder;
