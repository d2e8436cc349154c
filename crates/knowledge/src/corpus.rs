//! SQLite corpus: ingestion, listing and similarity search.

use crate::chunker;
use crate::embeddings::EmbeddingProvider;
use crate::index::{self, StoredDocument};
use crate::parser::{self, ContentType};
use crate::retriever::{CorpusListing, SimilarityRetriever};
use crate::types::{DocumentEntry, IngestOptions, IngestStats, RetrievedChunk};
use async_trait::async_trait;
use chrono::Utc;
use docchat_core::{AppError, AppResult};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use walkdir::WalkDir;

/// A corpus stored in a single SQLite file.
///
/// The connection lock is never held across an embedding call.
pub struct SqliteCorpus {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteCorpus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCorpus")
            .field("path", &self.path)
            .field("embedder", &self.embedder)
            .finish()
    }
}

impl SqliteCorpus {
    /// Open a corpus, checking that it was built with the configured embedder.
    pub fn open(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let conn = index::init_index(path)?;
        index::ensure_embedding_model(&conn, embedder.model_name(), embedder.dimensions())?;

        tracing::debug!(
            "Opened corpus {:?} (embedder: {}/{})",
            path,
            embedder.provider_name(),
            embedder.model_name()
        );

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
            path: path.to_path_buf(),
        })
    }

    /// Open a corpus after clearing it, so a different embedder may take over.
    pub fn recreate(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> AppResult<Self> {
        let conn = index::init_index(path)?;
        index::reset_index(&conn)?;
        drop(conn);
        Self::open(path, embedder)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count documents and chunks.
    pub fn stats(&self) -> AppResult<(u32, u32)> {
        index::get_stats(&*self.lock()?)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Retrieval("Corpus connection lock poisoned".to_string()))
    }

    /// Ingest files and directories into the corpus.
    pub async fn ingest(&self, options: &IngestOptions) -> AppResult<IngestStats> {
        let start = Instant::now();

        tracing::info!("Starting ingestion of {} path(s)", options.paths.len());

        let mut stats = IngestStats::default();

        for file in collect_files(&options.paths) {
            let relative_path = relative_document_path(&file, &options.root);

            let text = match parser::parse_file(&file) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", relative_path, e);
                    continue;
                }
            };

            let content_hash = hash_content(&text);
            let unchanged = index::document_hash(&*self.lock()?, &relative_path)?
                .is_some_and(|stored| stored == content_hash);
            if unchanged {
                tracing::debug!("Unchanged, skipping: {}", relative_path);
                stats.skipped += 1;
                continue;
            }

            let written = self
                .ingest_document(&relative_path, &text, content_hash, options)
                .await?;

            stats.documents += 1;
            stats.chunks += written;
            stats.bytes += text.len() as u64;
        }

        stats.duration_secs = start.elapsed().as_secs_f64();

        tracing::info!(
            "Ingestion completed: {} documents ({} unchanged), {} chunks, {} bytes in {:.2}s",
            stats.documents,
            stats.skipped,
            stats.chunks,
            stats.bytes,
            stats.duration_secs
        );

        Ok(stats)
    }

    async fn ingest_document(
        &self,
        relative_path: &str,
        text: &str,
        content_hash: String,
        options: &IngestOptions,
    ) -> AppResult<u32> {
        let candidates = chunker::chunk_text(text, options.chunk_size, options.chunk_overlap);

        let mut embedded = Vec::with_capacity(candidates.len());
        for batch in candidates.chunks(options.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;

            if embeddings.len() != batch.len() {
                return Err(AppError::Retrieval(format!(
                    "Embedder returned {} vectors for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }

            embedded.extend(batch.iter().cloned().zip(embeddings));
        }

        let document = StoredDocument {
            id: uuid::Uuid::new_v4().to_string(),
            relative_path: relative_path.to_string(),
            content_hash,
            size_bytes: text.len() as u64,
            ingested_at: Utc::now(),
        };

        index::replace_document(&mut *self.lock()?, &document, &embedded)?;

        tracing::debug!("Indexed {}: {} chunks", relative_path, embedded.len());
        Ok(embedded.len() as u32)
    }
}

#[async_trait]
impl SimilarityRetriever for SqliteCorpus {
    async fn retrieve(&self, query: &str, top_k: usize) -> AppResult<Vec<RetrievedChunk>> {
        let query_embedding = self.embedder.embed(query).await?;

        let conn = self.lock()?;
        let (_, chunk_count) = index::get_stats(&conn)?;
        if chunk_count == 0 {
            return Err(AppError::Retrieval(
                "Corpus is empty. Run 'docchat ingest <paths>' first.".to_string(),
            ));
        }

        let results = index::query_chunks(&conn, &query_embedding, top_k)?;

        if let (Some(first), Some(last)) = (results.first(), results.last()) {
            tracing::info!(
                "Retrieved {} chunks (top score: {:.3}, lowest: {:.3})",
                results.len(),
                first.score,
                last.score
            );
        }

        Ok(results)
    }
}

impl CorpusListing for SqliteCorpus {
    fn list_documents(&self) -> AppResult<Vec<DocumentEntry>> {
        index::list_documents(&*self.lock()?)
    }
}

/// Expand paths into the supported files beneath them, sorted for stable runs.
fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if ContentType::from_path(path).is_supported() {
                files.push(path.clone());
            } else {
                tracing::warn!("Unsupported document type, skipping: {:?}", path);
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file() && ContentType::from_path(entry_path).is_supported() {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else {
            tracing::warn!("Path does not exist: {:?}", path);
        }
    }

    files.sort();
    files.dedup();
    files
}

/// Document key: the path relative to `root`, or the absolute path for files
/// outside it. Both sides are canonicalised so keys stay stable across runs.
fn relative_document_path(path: &Path, root: &Path) -> String {
    let path = canonical(path);
    let root = canonical(root);
    match path.strip_prefix(&root) {
        Ok(relative) => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn hash_content(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
