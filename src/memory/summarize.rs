//! Exchange summarization for display and embedding.

use crate::memory::types::ExtractedFact;

/// How many of the highest-importance facts a summary carries.
const MAX_FACTS: usize = 3;

/// Characters of the message kept by the truncation fallbacks.
const PREVIEW_CHARS: usize = 100;

/// Condense an exchange into a short human-readable summary.
///
/// Extracted facts take priority: the top [`MAX_FACTS`] by importance are
/// joined with `". "`. Ties keep extraction order (the sort is stable).
/// Without facts, questions become `"User asked: …"`, longer statements
/// `"User said: …"`, and short messages pass through verbatim.
pub fn generate_summary(user_message: &str, facts: &[ExtractedFact]) -> String {
    if !facts.is_empty() {
        let mut ranked: Vec<&ExtractedFact> = facts.iter().collect();
        ranked.sort_by(|a, b| b.importance.cmp(&a.importance));
        return ranked
            .iter()
            .take(MAX_FACTS)
            .map(|f| f.fact.as_str())
            .collect::<Vec<_>>()
            .join(". ");
    }

    if user_message.contains('?') {
        return format!("User asked: {}", preview(user_message));
    }
    if user_message.len() > 50 {
        return format!("User said: {}", preview(user_message));
    }
    user_message.to_string()
}

/// First [`PREVIEW_CHARS`] characters of `text`, with `"..."` appended when
/// anything was cut. Operates on characters, not bytes.
fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    }
}
