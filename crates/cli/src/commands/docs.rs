//! Docs command handler.

use crate::bootstrap::open_corpus;
use clap::Args;
use docchat_core::{config::AppConfig, AppError, AppResult};
use docchat_knowledge::CorpusListing;

/// List the documents in the corpus
#[derive(Args, Debug)]
pub struct DocsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DocsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing docs command");

        let corpus = open_corpus(config)?;
        let documents = corpus.list_documents()?;

        if self.json {
            let json = serde_json::to_string_pretty(&documents)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
            return Ok(());
        }

        if documents.is_empty() {
            println!("No documents indexed. Run 'docchat ingest <paths>' first.");
            return Ok(());
        }

        for document in &documents {
            println!(
                "{}  ({} chunks, {} bytes, {})",
                document.relative_path,
                document.chunk_count,
                document.size_bytes,
                document.ingested_at.format("%Y-%m-%d %H:%M")
            );
        }
        println!("{} documents", documents.len());

        Ok(())
    }
}
