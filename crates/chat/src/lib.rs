//! Conversation loop for docchat.
//!
//! Holds the per-session state, the history window, the history summarizer
//! and the [`ChatEngine`] that turns user actions into session transitions.

pub mod engine;
pub mod history;
pub mod sanitize;
pub mod session;
pub mod summarizer;

#[cfg(test)]
mod tests;

pub use engine::{ChatEngine, ChatPrompts, EngineOptions, Outcome, TurnReport, UserAction};
pub use history::{format_history, history_window};
pub use sanitize::strip_quotes;
pub use session::{ChatSettings, ConversationLog, Role, Session, SessionSnapshot, Turn, TurnStage};
pub use summarizer::HistorySummarizer;
