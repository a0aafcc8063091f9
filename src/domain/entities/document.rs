use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub content_type: String,
    pub text: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            content_type: "text/plain".to_string(),
            text: text.into(),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(document_id: Uuid, content: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content: content.into(),
            chunk_index,
            metadata: ChunkMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: Option<String>,
    pub page: Option<usize>,
    pub section: Option<String>,
}

/// A retrieved chunk together with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: DocumentChunk,
    pub score: f32,
}

impl SearchResult {
    pub fn content(&self) -> &str {
        &self.chunk.content
    }
}

/// Splits content into chunks by paragraph boundaries.
///
/// Paragraphs are joined until they exceed `chunk_size` bytes, then a new chunk
/// starts. A paragraph longer than `chunk_size` is cut at the last whitespace
/// that fits, or at a char boundary when there is none. Every chunk after the
/// first is prefixed with the trailing `chunk_overlap` bytes of its predecessor,
/// with leading whitespace of that tail dropped. `chunk_overlap` is capped at
/// half of `chunk_size`. Each chunk is assigned a sequential index starting from 0.
pub fn chunk_content(
    document_id: Uuid,
    content: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<DocumentChunk> {
    let chunk_size = chunk_size.max(1);
    let chunk_overlap = chunk_overlap.min(chunk_size / 2);

    let mut packed: Vec<String> = Vec::new();
    let mut current_chunk = String::new();

    let paragraphs = content
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty());

    for paragraph in paragraphs {
        for piece in split_oversized(paragraph, chunk_size) {
            let would_exceed =
                !current_chunk.is_empty() && current_chunk.len() + piece.len() + 2 > chunk_size;

            if would_exceed {
                packed.push(std::mem::take(&mut current_chunk));
            }

            if !current_chunk.is_empty() {
                current_chunk.push_str("\n\n");
            }
            current_chunk.push_str(piece);
        }
    }

    if !current_chunk.is_empty() {
        packed.push(current_chunk);
    }

    packed
        .iter()
        .enumerate()
        .map(|(chunk_index, text)| {
            let content = match chunk_index.checked_sub(1) {
                Some(prev) if chunk_overlap > 0 => {
                    let overlap = tail(&packed[prev], chunk_overlap).trim_start();
                    format!("{overlap}\n\n{text}")
                }
                _ => text.clone(),
            };
            DocumentChunk::new(document_id, content, chunk_index)
        })
        .collect()
}

fn split_oversized(text: &str, max_len: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while rest.len() > max_len {
        let mut end = max_len;
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if let Some(ws) = rest[..end].rfind(char::is_whitespace).filter(|&ws| ws > 0) {
            end = ws;
        }
        if end == 0 {
            // a single char wider than max_len
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        let (head, remainder) = rest.split_at(end);
        let head = head.trim_end();
        if !head.is_empty() {
            pieces.push(head);
        }
        rest = remainder.trim_start();
    }

    if !rest.is_empty() {
        pieces.push(rest);
    }
    pieces
}

fn tail(text: &str, len: usize) -> &str {
    if text.len() <= len {
        return text;
    }
    let mut start = text.len() - len;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
