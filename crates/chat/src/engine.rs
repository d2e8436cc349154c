//! The conversation loop.
//!
//! [`ChatEngine::handle`] takes one discrete [`UserAction`] and applies exactly
//! one transition to the [`Session`]. Questions run the full turn:
//! summarize (when history applies), retrieve, build the prompt, complete.
//! Nothing is retried; the first failing stage aborts the turn.

use crate::history::{format_history, history_window};
use crate::sanitize::strip_quotes;
use crate::session::{ChatSettings, Session, SessionSnapshot, Turn, TurnStage};
use crate::summarizer::HistorySummarizer;
use docchat_core::config::AppConfig;
use docchat_core::{AppError, AppResult};
use docchat_knowledge::{
    concatenate_chunks, source_paths, CorpusListing, DocumentEntry, SimilarityRetriever,
};
use docchat_llm::{LlmClient, LlmRequest, LlmUsage, ModelName};
use docchat_prompt::{
    build_answer_prompt, builtin_prompt, load_prompt, AnswerInputs, PromptDefinition,
    ANSWER_PROMPT_ID, SUMMARY_PROMPT_ID,
};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// A discrete event from the user interface.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    Ask(String),
    SelectModel(ModelName),
    SetUseHistory(bool),
    SetDebug(bool),
    Reset,
    ListDocuments,
    InspectState,
}

/// Result of handling one action.
#[derive(Debug, Clone)]
pub enum Outcome {
    Answered(TurnReport),
    SettingsChanged(ChatSettings),
    ConversationReset,
    Documents(Vec<DocumentEntry>),
    State(SessionSnapshot),
}

/// Everything the interface displays after a completed turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnReport {
    /// Sanitized question as stored in the log
    pub question: String,

    /// Sanitized answer as stored in the log
    pub answer: String,

    pub model: ModelName,

    /// Text sent to the retriever: the summary, or the question
    pub retrieval_query: String,

    /// Source documents of the retrieved chunks
    pub sources: Vec<String>,

    /// History summary, only reported in debug mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    pub usage: LlmUsage,
}

/// Tunables of the conversation loop.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Chunks retrieved per question (K)
    pub num_chunks: usize,

    /// Turns considered for history (W), the current question included
    pub slide_window: usize,

    /// Language the answer prompt asks for
    pub language: String,

    /// Catalog identifier -> backend model tag
    pub model_aliases: HashMap<String, String>,

    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            num_chunks: 3,
            slide_window: 7,
            language: "Spanish".to_string(),
            model_aliases: HashMap::new(),
            max_tokens: None,
            temperature: None,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            num_chunks: config.chat.num_chunks,
            slide_window: config.chat.slide_window,
            language: config.chat.language.clone(),
            model_aliases: config.model_aliases.clone(),
            max_tokens: None,
            temperature: None,
        }
    }

    /// Backend tag for a catalog model; unmapped identifiers pass through.
    pub fn backend_model(&self, model: ModelName) -> String {
        self.model_aliases
            .get(model.as_str())
            .cloned()
            .unwrap_or_else(|| model.as_str().to_string())
    }
}

/// The answer and summary prompt definitions.
#[derive(Debug, Clone)]
pub struct ChatPrompts {
    pub answer: PromptDefinition,
    pub summary: PromptDefinition,
}

impl ChatPrompts {
    /// Built-in templates only.
    pub fn builtin() -> AppResult<Self> {
        Ok(Self {
            answer: builtin_prompt(ANSWER_PROMPT_ID)?,
            summary: builtin_prompt(SUMMARY_PROMPT_ID)?,
        })
    }

    /// Templates with workspace overrides applied.
    pub fn load(workspace: &Path) -> AppResult<Self> {
        Ok(Self {
            answer: load_prompt(workspace, ANSWER_PROMPT_ID)?,
            summary: load_prompt(workspace, SUMMARY_PROMPT_ID)?,
        })
    }
}

/// Orchestrates the summarizer, retriever, prompt builder and completion client.
pub struct ChatEngine {
    client: Arc<dyn LlmClient>,
    retriever: Arc<dyn SimilarityRetriever>,
    listing: Arc<dyn CorpusListing>,
    summarizer: HistorySummarizer,
    answer_prompt: PromptDefinition,
    options: EngineOptions,
}

impl ChatEngine {
    pub fn new(
        client: Arc<dyn LlmClient>,
        retriever: Arc<dyn SimilarityRetriever>,
        listing: Arc<dyn CorpusListing>,
        prompts: ChatPrompts,
        options: EngineOptions,
    ) -> Self {
        Self {
            summarizer: HistorySummarizer::new(Arc::clone(&client), prompts.summary),
            client,
            retriever,
            listing,
            answer_prompt: prompts.answer,
            options,
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    /// Apply one user action to the session.
    pub async fn handle(&self, session: &mut Session, action: UserAction) -> AppResult<Outcome> {
        tracing::debug!(session = %session.id(), "Handling action: {:?}", action);

        match action {
            UserAction::Ask(question) => Ok(Outcome::Answered(self.ask(session, &question).await?)),
            UserAction::SelectModel(model) => {
                tracing::info!("Model selected: {}", model);
                session.settings.model = model;
                Ok(Outcome::SettingsChanged(session.settings))
            }
            UserAction::SetUseHistory(enabled) => {
                tracing::info!("Use history: {}", enabled);
                session.settings.use_history = enabled;
                Ok(Outcome::SettingsChanged(session.settings))
            }
            UserAction::SetDebug(enabled) => {
                tracing::info!("Debug: {}", enabled);
                session.settings.debug = enabled;
                Ok(Outcome::SettingsChanged(session.settings))
            }
            UserAction::Reset => {
                session.reset();
                Ok(Outcome::ConversationReset)
            }
            UserAction::ListDocuments => Ok(Outcome::Documents(self.listing.list_documents()?)),
            UserAction::InspectState => Ok(Outcome::State(session.snapshot())),
        }
    }

    /// Run one question through the loop.
    ///
    /// On failure the user turn stays in the log and the session returns to `Idle`.
    pub async fn ask(&self, session: &mut Session, question: &str) -> AppResult<TurnReport> {
        let question = strip_quotes(question.trim());
        if question.trim().is_empty() {
            return Err(AppError::Chat("Question must not be empty".to_string()));
        }

        let window: Vec<Turn> = if session.settings.use_history {
            history_window(session.log.turns(), self.options.slide_window).to_vec()
        } else {
            Vec::new()
        };

        session.log.push(Turn::user(question.clone()));

        let result = self.run_turn(session, question, &window).await;
        session.set_stage(TurnStage::Idle);

        if let Err(ref e) = result {
            tracing::warn!(session = %session.id(), "Turn aborted: {}", e);
        }
        result
    }

    async fn run_turn(
        &self,
        session: &mut Session,
        question: String,
        window: &[Turn],
    ) -> AppResult<TurnReport> {
        let settings = session.settings;
        let backend_model = self.options.backend_model(settings.model);
        let chat_history = format_history(window);

        let summary = if window.is_empty() {
            None
        } else {
            session.set_stage(TurnStage::Summarizing);
            Some(
                self.summarizer
                    .summarize(&backend_model, &chat_history, &question)
                    .await?,
            )
        };
        let retrieval_query = summary.clone().unwrap_or_else(|| question.clone());

        session.set_stage(TurnStage::Retrieving);
        let mut chunks = self
            .retriever
            .retrieve(&retrieval_query, self.options.num_chunks)
            .await?;
        if chunks.len() > self.options.num_chunks {
            tracing::warn!(
                "Retriever returned {} chunks for top-{}; truncating",
                chunks.len(),
                self.options.num_chunks
            );
            chunks.truncate(self.options.num_chunks);
        }
        let context = strip_quotes(&concatenate_chunks(&chunks));

        let prompt = build_answer_prompt(
            &self.answer_prompt,
            &AnswerInputs {
                chat_history: &chat_history,
                context: &context,
                question: &question,
                language: &self.options.language,
            },
        )?;
        tracing::debug!(
            "Built answer prompt: {} bytes ({} history, {} context)",
            prompt.text.len(),
            chat_history.len(),
            context.len()
        );

        session.set_stage(TurnStage::Completing);
        let mut request = LlmRequest::new(prompt.text, backend_model);
        if let Some(max_tokens) = self.options.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.options.temperature {
            request = request.with_temperature(temperature);
        }

        tracing::info!("Requesting completion from {} ({})", settings.model, request.model);
        let response = self.client.complete(&request).await?;
        let answer = strip_quotes(&response.content);

        session.set_stage(TurnStage::Displaying);
        session.log.push(Turn::assistant(answer.clone()));

        Ok(TurnReport {
            question,
            answer,
            model: settings.model,
            retrieval_query,
            sources: source_paths(&chunks),
            summary: if settings.debug { summary } else { None },
            usage: response.usage,
        })
    }
}
