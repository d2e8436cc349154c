//! Document corpus for retrieval-augmented chat.
//!
//! Ingests local documents into a SQLite index of embedded chunks and serves
//! top-K similarity search over it.

pub mod chunker;
pub mod corpus;
pub mod embeddings;
pub mod index;
pub mod parser;
pub mod retriever;
pub mod types;


pub use corpus::SqliteCorpus;
pub use embeddings::{create_provider, EmbeddingProvider};
pub use retriever::{concatenate_chunks, source_paths, CorpusListing, SimilarityRetriever};
pub use types::{DocumentEntry, IngestOptions, IngestStats, RetrievedChunk};
