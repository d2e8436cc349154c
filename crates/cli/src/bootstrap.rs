//! Wiring of the corpus, completion client and chat engine from configuration.

use docchat_chat::{ChatEngine, ChatPrompts, EngineOptions};
use docchat_core::{config::AppConfig, AppError, AppResult};
use docchat_knowledge::{create_provider, SqliteCorpus};
use docchat_llm::create_client;
use std::sync::Arc;

/// Open the configured corpus with the configured embedder.
pub fn open_corpus(config: &AppConfig) -> AppResult<Arc<SqliteCorpus>> {
    let embedder = create_provider(&config.embedding)?;
    let corpus = SqliteCorpus::open(&config.index_path(), embedder)?;
    Ok(Arc::new(corpus))
}

/// Build the chat engine over the configured corpus and provider.
pub fn build_engine(config: &AppConfig, options: EngineOptions) -> AppResult<ChatEngine> {
    let api_key = config.resolve_api_key();
    let client = create_client(&config.provider, config.endpoint.as_deref(), api_key.as_deref())
        .map_err(AppError::Config)?;

    let corpus = open_corpus(config)?;
    let prompts = ChatPrompts::load(&config.workspace)?;

    tracing::debug!(
        "Engine ready: provider={}, corpus={:?}, k={}, window={}",
        client.provider_name(),
        corpus.path(),
        options.num_chunks,
        options.slide_window
    );

    Ok(ChatEngine::new(
        client,
        corpus.clone(),
        corpus,
        prompts,
        options,
    ))
}

/// Convert an edge error into the application error type.
pub fn edge_error(err: anyhow::Error) -> AppError {
    AppError::Other(format!("{:#}", err))
}
