//! Folds recent history into a standalone retrieval query.

use crate::sanitize::strip_quotes;
use docchat_core::AppResult;
use docchat_llm::{LlmClient, LlmRequest};
use docchat_prompt::{build_summary_prompt, PromptDefinition};
use std::sync::Arc;

/// One completion call that rewrites the question with its history.
#[derive(Clone)]
pub struct HistorySummarizer {
    client: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
}

impl HistorySummarizer {
    pub fn new(client: Arc<dyn LlmClient>, prompt: PromptDefinition) -> Self {
        Self { client, prompt }
    }

    /// Produce the retrieval query for `question` given the rendered history.
    ///
    /// A blank completion falls back to the question itself.
    pub async fn summarize(
        &self,
        backend_model: &str,
        chat_history: &str,
        question: &str,
    ) -> AppResult<String> {
        let built = build_summary_prompt(&self.prompt, chat_history, question)?;

        tracing::info!(
            "Summarizing {} bytes of history with {}",
            chat_history.len(),
            backend_model
        );

        let response = self
            .client
            .complete(&LlmRequest::new(built.text, backend_model))
            .await?;

        let summary = strip_quotes(response.content.trim());
        if summary.is_empty() {
            tracing::warn!("Summarizer returned an empty query; using the question");
            return Ok(question.to_string());
        }

        tracing::debug!("History summary: {}", summary);
        Ok(summary)
    }
}
