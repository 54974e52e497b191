//! Source label parsing and snippet truncation

use regex::Regex;
use std::sync::OnceLock;

fn source_label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Matches `[Source 2]` as well as `[Source 2 - report.pdf]`
    PATTERN.get_or_init(|| Regex::new(r"\[Source\s+(\d+)").expect("Invalid regex"))
}

/// Collect the 1-based `[Source N]` labels an answer refers to
///
/// Returned indices are sorted, unique and within `1..=available`.
pub fn extract_cited_sources(answer: &str, available: usize) -> Vec<usize> {
    let mut cited: Vec<usize> = source_label_pattern()
        .captures_iter(answer)
        .filter_map(|cap| cap.get(1).and_then(|m| m.as_str().parse().ok()))
        .filter(|&n| n >= 1 && n <= available)
        .collect();

    cited.sort_unstable();
    cited.dedup();
    cited
}

/// Truncate to `max_chars` characters, appending `...` if anything was cut
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_pos, _)) => format!("{}...", &content[..byte_pos]),
        None => content.to_string(),
    }
}
