//! Sliding history window and its rendering for prompts.

use crate::session::Turn;

/// Turns preceding the current question that the summarizer may see.
///
/// `slide_window` counts the current question, so at most
/// `slide_window - 1` prior turns are returned, newest last.
pub fn history_window(prior: &[Turn], slide_window: usize) -> &[Turn] {
    let keep = slide_window.saturating_sub(1);
    let start = prior.len().saturating_sub(keep);
    &prior[start..]
}

/// Render turns as `role: content` lines, oldest first.
pub fn format_history(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role(), turn.content()))
        .collect::<Vec<_>>()
        .join("\n")
}
