//! Bounded context assembly from ranked retrieval hits

use crate::types::RetrievalHit;

/// Separator placed between context blocks
const BLOCK_SEPARATOR: &str = "\n";

/// Builds the labelled context window handed to the generator
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_context_length: usize,
}

impl ContextAssembler {
    /// Create a new context assembler with a budget in characters
    #[must_use]
    pub const fn new(max_context_length: usize) -> Self {
        Self { max_context_length }
    }

    pub fn max_context_length(&self) -> usize {
        self.max_context_length
    }

    /// Assemble `hits` in order until the next block would exceed the budget
    ///
    /// Returns the context and the number of hits it contains. Separators
    /// count towards the budget, so `context.chars().count()` never exceeds
    /// `max_context_length`.
    #[must_use]
    pub fn assemble(&self, hits: &[RetrievalHit]) -> (String, usize) {
        let mut context = String::new();
        let mut total_length = 0usize;
        let mut used = 0usize;

        for (idx, hit) in hits.iter().enumerate() {
            let block = Self::format_block(idx + 1, hit);
            let separator = if used == 0 { "" } else { BLOCK_SEPARATOR };
            let added = separator.chars().count() + block.chars().count();

            if total_length + added > self.max_context_length {
                break;
            }

            context.push_str(separator);
            context.push_str(&block);
            total_length += added;
            used += 1;
        }

        tracing::debug!(
            "Assembled context: {} of {} hits, {} chars (budget {})",
            used,
            hits.len(),
            total_length,
            self.max_context_length
        );

        (context, used)
    }

    /// `[Source i - name]` header followed by the passage text
    fn format_block(label: usize, hit: &RetrievalHit) -> String {
        format!("[Source {} - {}]\n{}\n", label, hit.source_name(), hit.content)
    }
}
