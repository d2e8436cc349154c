//! Ingest command handler.

use crate::bootstrap::open_corpus;
use clap::Args;
use docchat_core::{config::AppConfig, AppError, AppResult};
use docchat_knowledge::{create_provider, IngestOptions, SqliteCorpus};
use std::path::PathBuf;
use std::sync::Arc;

/// Add files or directories to the corpus
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Clear the corpus before ingesting
    #[arg(long)]
    pub reset: bool,

    /// Characters per chunk (default from config)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared between consecutive chunks (default from config)
    #[arg(long)]
    pub overlap: Option<usize>,

    /// Chunks per embedding request
    #[arg(long, default_value = "16")]
    pub batch_size: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ingest command for {} path(s)", self.paths.len());

        let options = self.ingest_options(config)?;

        // Clears the recorded embedder before the model check
        let corpus = if self.reset {
            let embedder = create_provider(&config.embedding)?;
            Arc::new(SqliteCorpus::recreate(&config.index_path(), embedder)?)
        } else {
            open_corpus(config)?
        };

        let stats = corpus.ingest(&options).await?;

        if self.json {
            let output = serde_json::json!({
                "documents": stats.documents,
                "skipped": stats.skipped,
                "chunks": stats.chunks,
                "bytes": stats.bytes,
                "durationSecs": stats.duration_secs,
            });
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!(
                "Ingested {} documents ({} unchanged, {} chunks, {} bytes) in {:.2}s",
                stats.documents, stats.skipped, stats.chunks, stats.bytes, stats.duration_secs
            );
        }

        Ok(())
    }

    /// Resolve chunking options; document keys are relative to the workspace.
    fn ingest_options(&self, config: &AppConfig) -> AppResult<IngestOptions> {
        let chunk_size = self.chunk_size.unwrap_or(config.corpus.chunk_size);
        let chunk_overlap = self.overlap.unwrap_or(config.corpus.chunk_overlap);
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(AppError::Config(format!(
                "Overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }

        Ok(IngestOptions {
            paths: self.paths.clone(),
            root: config.workspace.clone(),
            chunk_size,
            chunk_overlap,
            batch_size: self.batch_size,
        })
    }
}
