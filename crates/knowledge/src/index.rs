//! SQLite-backed chunk index.
//!
//! Every statement binds its values as parameters; no caller-provided text is
//! ever spliced into SQL.

use crate::types::{ChunkCandidate, DocumentEntry, RetrievedChunk};
use chrono::{DateTime, Utc};
use docchat_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// A document row about to be written.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: String,
    pub relative_path: String,
    pub content_hash: String,
    pub size_bytes: u64,
    pub ingested_at: DateTime<Utc>,
}

/// Open (creating if needed) the SQLite index database.
pub fn init_index(db_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            AppError::Retrieval(format!("Failed to create index directory: {}", e))
        })?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| AppError::Retrieval(format!("Failed to open SQLite index: {}", e)))?;

    init_schema(&conn)?;

    tracing::debug!("Initialized SQLite index at {:?}", db_path);
    Ok(conn)
}

/// Create tables if they do not exist.
pub fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS corpus_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            relative_path TEXT NOT NULL UNIQUE,
            content_hash TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            ingested_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            chunk TEXT NOT NULL,
            embedding BLOB NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id);
        "#,
    )
    .map_err(|e| AppError::Retrieval(format!("Failed to create tables: {}", e)))
}

/// Record the embedding model of the corpus, or check it against the recorded one.
///
/// A mismatch is only tolerated while the corpus holds no chunks.
pub fn ensure_embedding_model(conn: &Connection, model: &str, dimensions: usize) -> AppResult<()> {
    let recorded = read_meta(conn, "embedding_model")?;
    let recorded_dims = read_meta(conn, "embedding_dimensions")?;
    let wanted_dims = dimensions.to_string();

    let matches = recorded.as_deref() == Some(model)
        && recorded_dims.as_deref() == Some(wanted_dims.as_str());
    if matches {
        return Ok(());
    }

    let (_, chunk_count) = get_stats(conn)?;
    if recorded.is_some() && chunk_count > 0 {
        return Err(AppError::Retrieval(format!(
            "Corpus was indexed with embedding model '{}' ({} dims) but '{}' ({} dims) is configured. Re-ingest with --reset.",
            recorded.unwrap_or_default(),
            recorded_dims.unwrap_or_default(),
            model,
            dimensions
        )));
    }

    write_meta(conn, "embedding_model", model)?;
    write_meta(conn, "embedding_dimensions", &wanted_dims)?;
    Ok(())
}

fn read_meta(conn: &Connection, key: &str) -> AppResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM corpus_meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| AppError::Retrieval(format!("Failed to read corpus metadata: {}", e)))
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
    conn.execute(
        "INSERT INTO corpus_meta (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )
    .map_err(|e| AppError::Retrieval(format!("Failed to write corpus metadata: {}", e)))?;
    Ok(())
}

/// Look up the stored content hash of a document.
pub fn document_hash(conn: &Connection, relative_path: &str) -> AppResult<Option<String>> {
    conn.query_row(
        "SELECT content_hash FROM documents WHERE relative_path = ?1",
        params![relative_path],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| AppError::Retrieval(format!("Failed to look up document: {}", e)))
}

/// Replace a document and all of its chunks in one transaction.
pub fn replace_document(
    conn: &mut Connection,
    document: &StoredDocument,
    chunks: &[(ChunkCandidate, Vec<f32>)],
) -> AppResult<()> {
    let tx = conn
        .transaction()
        .map_err(|e| AppError::Retrieval(format!("Failed to begin transaction: {}", e)))?;

    tx.execute(
        "DELETE FROM chunks WHERE document_id IN
            (SELECT id FROM documents WHERE relative_path = ?1)",
        params![document.relative_path],
    )
    .map_err(|e| AppError::Retrieval(format!("Failed to delete old chunks: {}", e)))?;

    tx.execute(
        "DELETE FROM documents WHERE relative_path = ?1",
        params![document.relative_path],
    )
    .map_err(|e| AppError::Retrieval(format!("Failed to delete old document: {}", e)))?;

    tx.execute(
        "INSERT INTO documents (id, relative_path, content_hash, size_bytes, ingested_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            document.id,
            document.relative_path,
            document.content_hash,
            document.size_bytes as i64,
            document.ingested_at.to_rfc3339(),
        ],
    )
    .map_err(|e| AppError::Retrieval(format!("Failed to insert document: {}", e)))?;

    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO chunks (id, document_id, position, chunk, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .map_err(|e| AppError::Retrieval(format!("Failed to prepare chunk insert: {}", e)))?;

        for (candidate, embedding) in chunks {
            let chunk_id = format!("{}:{}", document.id, candidate.position);
            stmt.execute(params![
                chunk_id,
                document.id,
                candidate.position as i64,
                candidate.text,
                embedding_to_bytes(embedding),
            ])
            .map_err(|e| AppError::Retrieval(format!("Failed to insert chunk: {}", e)))?;
        }
    }

    tx.commit()
        .map_err(|e| AppError::Retrieval(format!("Failed to commit document: {}", e)))
}

/// List indexed documents ordered by path.
pub fn list_documents(conn: &Connection) -> AppResult<Vec<DocumentEntry>> {
    let mut stmt = conn
        .prepare(
            "SELECT d.relative_path, d.size_bytes, d.ingested_at, COUNT(c.id)
             FROM documents d LEFT JOIN chunks c ON c.document_id = d.id
             GROUP BY d.id
             ORDER BY d.relative_path",
        )
        .map_err(|e| AppError::Retrieval(format!("Failed to prepare listing: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })
        .map_err(|e| AppError::Retrieval(format!("Failed to list documents: {}", e)))?;

    let mut documents = Vec::new();
    for row in rows {
        let (relative_path, size_bytes, ingested_at, chunk_count) =
            row.map_err(|e| AppError::Retrieval(format!("Failed to read document row: {}", e)))?;

        let ingested_at = DateTime::parse_from_rfc3339(&ingested_at)
            .map_err(|e| {
                AppError::Retrieval(format!("Invalid timestamp for {}: {}", relative_path, e))
            })?
            .with_timezone(&Utc);

        documents.push(DocumentEntry {
            relative_path,
            size_bytes: size_bytes as u64,
            chunk_count: chunk_count as u32,
            ingested_at,
        });
    }

    Ok(documents)
}

/// Query the index for the top-k chunks most similar to the query embedding.
///
/// Results are ordered by descending cosine similarity.
pub fn query_chunks(
    conn: &Connection,
    query_embedding: &[f32],
    top_k: usize,
) -> AppResult<Vec<RetrievedChunk>> {
    if top_k == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn
        .prepare(
            "SELECT c.chunk, d.relative_path, c.embedding
             FROM chunks c JOIN documents d ON d.id = c.document_id",
        )
        .map_err(|e| AppError::Retrieval(format!("Failed to prepare query: {}", e)))?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Vec<u8>>(2)?,
            ))
        })
        .map_err(|e| AppError::Retrieval(format!("Failed to query chunks: {}", e)))?;

    let mut results = Vec::new();
    for row in rows {
        let (text, source_path, embedding_bytes) =
            row.map_err(|e| AppError::Retrieval(format!("Failed to read chunk row: {}", e)))?;
        let embedding = bytes_to_embedding(&embedding_bytes)?;

        results.push(RetrievedChunk {
            score: cosine_similarity(query_embedding, &embedding),
            text,
            source_path,
        });
    }

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_k);

    tracing::debug!(
        "Retrieved {} chunks (requested top-{})",
        results.len(),
        top_k
    );

    Ok(results)
}

/// Count documents and chunks.
pub fn get_stats(conn: &Connection) -> AppResult<(u32, u32)> {
    let documents: i64 = conn
        .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
        .map_err(|e| AppError::Retrieval(format!("Failed to count documents: {}", e)))?;

    let chunks: i64 = conn
        .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
        .map_err(|e| AppError::Retrieval(format!("Failed to count chunks: {}", e)))?;

    Ok((documents as u32, chunks as u32))
}

/// Delete all documents, chunks and corpus metadata.
pub fn reset_index(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        "DELETE FROM chunks; DELETE FROM documents; DELETE FROM corpus_meta;",
    )
    .map_err(|e| AppError::Retrieval(format!("Failed to reset index: {}", e)))?;

    tracing::info!("Reset corpus index");
    Ok(())
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Retrieval(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
