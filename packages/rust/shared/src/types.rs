//! Chunk records produced by the docprep pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ChunkId
// ---------------------------------------------------------------------------

/// A UUID v5 identifier derived from a chunk's source path and position.
///
/// The same `(relative_path, chunk_index)` pair always yields the same id, so
/// re-ingesting an unchanged corpus replaces records instead of duplicating them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(pub Uuid);

impl ChunkId {
    /// Derive the identifier for chunk `index` of the file at `relative_path`.
    pub fn derive(relative_path: &str, index: usize) -> Self {
        let name = format!("{relative_path}:{index}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes()))
    }
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ChunkId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// DocChunk
// ---------------------------------------------------------------------------

/// One chunk of a general documentation page (`.md` / `.mdx`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocChunk {
    pub id: ChunkId,
    /// Chunk text, trimmed.
    pub content: String,
    /// Resolved once per document.
    pub document_title: String,
    pub h1: String,
    pub h2: String,
    pub h3: String,
    pub h4: String,
    /// Path relative to the corpus root, `/`-separated.
    pub file_path: String,
    pub absolute_path: String,
    /// JSON-encoded heading map (`{"Header 1": "...", ...}`).
    pub chunk_metadata: String,
    /// Zero-based position within the source document.
    pub chunk_index: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ApiChunk
// ---------------------------------------------------------------------------

/// One chunk of the API reference document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiChunk {
    pub id: ChunkId,
    pub content: String,
    pub document_title: String,
    /// Level-1 heading.
    pub api_section: String,
    /// Level-2 heading.
    pub endpoint_name: String,
    /// Level-3 heading.
    pub subsection: String,
    /// HTTP verb of the first `` `VERB /path` `` span, or empty.
    pub http_method: String,
    pub endpoint_path: String,
    pub file_path: String,
    pub chunk_index: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
