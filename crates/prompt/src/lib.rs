//! Prompt system for docchat.
//!
//! This crate provides structured prompt management with:
//! - YAML prompt definitions (built-in, overridable per workspace)
//! - Handlebars template rendering
//! - Typed builders for the answer and history-summary prompts

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_answer_prompt, build_prompt, build_summary_prompt, AnswerInputs};
pub use loader::{builtin_prompt, load_prompt, ANSWER_PROMPT_ID, SUMMARY_PROMPT_ID};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition};
