//! Prompt augmentation — folding retrieved memories into generation
//! instructions.

use crate::memory::types::Memory;

/// Header introducing the memory section of the instructions.
const CONTEXT_HEADER: &str =
    "## Previous conversation context\n\
     The following are things you have learned about this user in prior conversations:";

/// Trailing directive telling the generator how to use the section.
const CONTEXT_FOOTER: &str =
    "Use this context to personalize your responses and recall relevant facts \
     about the user when appropriate.";

/// Compose generation instructions from a base prompt and retrieved memories.
///
/// With no memories the base prompt is returned untouched. Otherwise a
/// delimited context section is appended: one bullet per memory (its summary,
/// or full content when the summary is empty) between a header and a closing
/// directive. Pure string composition — no I/O, inputs unmodified.
pub fn build_instructions(base_prompt: &str, memories: &[Memory]) -> String {
    if memories.is_empty() {
        return base_prompt.to_string();
    }

    let bullets: Vec<String> = memories
        .iter()
        .map(|m| {
            let line = if m.summary.trim().is_empty() {
                m.content.as_str()
            } else {
                m.summary.as_str()
            };
            format!("- {line}")
        })
        .collect();

    format!(
        "{base_prompt}\n\n{CONTEXT_HEADER}\n{}\n\n{CONTEXT_FOOTER}",
        bullets.join("\n")
    )
}
