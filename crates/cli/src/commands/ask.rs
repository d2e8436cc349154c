//! Ask command handler.
//!
//! Runs one conversation turn on a fresh session.

use crate::bootstrap::build_engine;
use clap::Args;
use docchat_chat::{EngineOptions, Session};
use docchat_core::{config::AppConfig, AppError, AppResult};

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    /// Maximum tokens in response
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Temperature for response generation (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let question = self.question.join(" ");

        let mut options = EngineOptions::from_config(config);
        options.max_tokens = self.max_tokens;
        options.temperature = self.temperature;

        let engine = build_engine(config, options)?;
        let mut session = Session::from_config(config)?;

        let report = engine.ask(&mut session, &question).await?;

        if self.json {
            let output = serde_json::json!({
                "answer": report.answer,
                "model": report.model,
                "provider": engine.provider_name(),
                "retrievalQuery": report.retrieval_query,
                "sources": report.sources,
                "usage": {
                    "promptTokens": report.usage.prompt_tokens,
                    "completionTokens": report.usage.completion_tokens,
                    "totalTokens": report.usage.total_tokens
                }
            });

            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}", report.answer);

            if tracing::enabled!(tracing::Level::DEBUG) {
                tracing::debug!(
                    "Token usage - Prompt: {}, Completion: {}, Total: {}",
                    report.usage.prompt_tokens,
                    report.usage.completion_tokens,
                    report.usage.total_tokens
                );
            }
        }

        Ok(())
    }
}
