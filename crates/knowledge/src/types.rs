//! Corpus domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A chunk returned by similarity search. Lives for one retrieval call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Chunk text
    pub text: String,

    /// Path of the source document, relative to the ingestion root
    pub source_path: String,

    /// Cosine similarity to the query embedding
    pub score: f32,
}

/// A document listed in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// Path relative to the ingestion root
    pub relative_path: String,

    /// Size of the extracted text in bytes
    pub size_bytes: u64,

    /// Number of chunks indexed for this document
    pub chunk_count: u32,

    /// When the document was (re)ingested
    pub ingested_at: DateTime<Utc>,
}

/// A stored chunk before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    /// Position within the document
    pub position: u32,

    /// Chunk text
    pub text: String,
}

/// Options for an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Files or directories to ingest
    pub paths: Vec<PathBuf>,

    /// Root that document keys are relative to (the workspace for the CLI)
    pub root: PathBuf,

    /// Characters per chunk
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Texts per embedding request
    pub batch_size: usize,
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Documents (re)indexed
    pub documents: u32,

    /// Documents skipped because their content was unchanged
    pub skipped: u32,

    /// Chunks written
    pub chunks: u32,

    /// Bytes of extracted text processed
    pub bytes: u64,

    /// Wall-clock duration
    pub duration_secs: f64,
}
