//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;

/// Chunk text into overlapping segments of at most `chunk_size` bytes.
///
/// Boundaries are moved back onto UTF-8 character boundaries. The last chunk
/// always ends at the end of the document, however short it is.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<ChunkCandidate> {
    let text = text.trim();
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let step = if chunk_size > overlap {
        chunk_size - overlap
    } else {
        chunk_size
    };

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            // chunk_size is smaller than the next character
            end = next_boundary(text, start + 1);
        }

        let piece = text[start..end].trim();
        if !piece.is_empty() {
            chunks.push(ChunkCandidate {
                position,
                text: piece.to_string(),
            });
            position += 1;
        }

        if end == text.len() {
            break;
        }

        start = next_boundary(text, start + step);
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

fn next_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index.min(text.len())
}
