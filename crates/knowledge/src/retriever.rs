//! Retrieval and listing seams used by the conversation loop.

use crate::types::{DocumentEntry, RetrievedChunk};
use async_trait::async_trait;
use docchat_core::AppResult;

/// Similarity search over a pre-indexed corpus.
#[async_trait]
pub trait SimilarityRetriever: Send + Sync {
    /// Return up to `top_k` chunks ordered by descending similarity to `query`.
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedChunk>>;
}

/// Read-only listing of the documents in a corpus.
pub trait CorpusListing: Send + Sync {
    fn list_documents(&self) -> AppResult<Vec<DocumentEntry>>;
}

/// Join every retrieved chunk into one context block, separated by blank lines.
pub fn concatenate_chunks(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Distinct source paths in retrieval order.
pub fn source_paths(chunks: &[RetrievedChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for chunk in chunks {
        if !sources.contains(&chunk.source_path) {
            sources.push(chunk.source_path.clone());
        }
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, source: &str) -> RetrievedChunk {
        RetrievedChunk {
            text: text.to_string(),
            source_path: source.to_string(),
            score: 0.5,
        }
    }

    #[test]
    fn test_concatenate_keeps_last_chunk() {
        let chunks = vec![
            chunk("Refunds within 30 days.", "refunds.md"),
            chunk("Store credit is instant.", "refunds.md"),
            chunk("Damaged items ship free.", "shipping.md"),
        ];

        let context = concatenate_chunks(&chunks);
        assert_eq!(
            context,
            "Refunds within 30 days.\n\nStore credit is instant.\n\nDamaged items ship free."
        );
    }

    #[test]
    fn test_concatenate_empty() {
        assert_eq!(concatenate_chunks(&[]), "");
    }

    #[test]
    fn test_source_paths_deduplicated() {
        let chunks = vec![
            chunk("a", "refunds.md"),
            chunk("b", "shipping.md"),
            chunk("c", "refunds.md"),
        ];
        assert_eq!(source_paths(&chunks), vec!["refunds.md", "shipping.md"]);
    }
}
