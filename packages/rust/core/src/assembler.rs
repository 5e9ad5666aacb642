//! Chunk assembly.
//!
//! Takes the sections produced by the heading splitter and turns them into
//! flat chunk records with stable ids and header-hierarchy fields.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, instrument};

use docprep_markdown::Section;
use docprep_shared::{ApiChunk, ChunkId, DocChunk, Result};

/// Document-level values copied into every chunk of a documentation page.
#[derive(Debug, Clone)]
pub struct DocContext<'a> {
    /// Path relative to the corpus root, `/`-separated.
    pub relative_path: &'a str,
    pub absolute_path: &'a str,
    pub title: &'a str,
}

/// Document-level values copied into every chunk of the API reference.
#[derive(Debug, Clone)]
pub struct ApiContext<'a> {
    pub file_path: &'a str,
    pub title: &'a str,
}

/// HTTP verb and path from a `` `POST /tables` `` style code span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub method: String,
    pub path: String,
}

/// Build documentation chunks. Blank sections are dropped before indexing,
/// so `chunk_index` is dense.
#[instrument(skip_all, fields(file = ctx.relative_path, sections = sections.len()))]
pub fn assemble_doc_chunks(
    sections: Vec<Section>,
    ctx: &DocContext<'_>,
    now: DateTime<Utc>,
) -> Result<Vec<DocChunk>> {
    let chunks = non_blank(sections)
        .map(|(index, section)| -> Result<DocChunk> {
            let chunk_metadata = serde_json::to_string(&section.path.to_map())?;
            Ok(DocChunk {
                id: ChunkId::derive(ctx.relative_path, index),
                content: section.text.trim().to_string(),
                document_title: ctx.title.to_string(),
                h1: section.path.text(1).to_string(),
                h2: section.path.text(2).to_string(),
                h3: section.path.text(3).to_string(),
                h4: section.path.text(4).to_string(),
                file_path: ctx.relative_path.to_string(),
                absolute_path: ctx.absolute_path.to_string(),
                chunk_metadata,
                chunk_index: index,
                created_at: now,
                updated_at: now,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(chunks = chunks.len(), "doc chunks assembled");
    Ok(chunks)
}

/// Build API reference chunks, pulling the endpoint out of each chunk's text.
#[instrument(skip_all, fields(file = ctx.file_path, sections = sections.len()))]
pub fn assemble_api_chunks(
    sections: Vec<Section>,
    ctx: &ApiContext<'_>,
    now: DateTime<Utc>,
) -> Vec<ApiChunk> {
    let chunks: Vec<ApiChunk> = non_blank(sections)
        .map(|(index, section)| {
            let endpoint = extract_endpoint(&section.text);
            let (http_method, endpoint_path) = endpoint
                .map(|e| (e.method, e.path))
                .unwrap_or_default();
            ApiChunk {
                id: ChunkId::derive(ctx.file_path, index),
                content: section.text.trim().to_string(),
                document_title: ctx.title.to_string(),
                api_section: section.path.text(1).to_string(),
                endpoint_name: section.path.text(2).to_string(),
                subsection: section.path.text(3).to_string(),
                http_method,
                endpoint_path,
                file_path: ctx.file_path.to_string(),
                chunk_index: index,
                created_at: now,
                updated_at: now,
            }
        })
        .collect();

    debug!(
        chunks = chunks.len(),
        endpoints = chunks.iter().filter(|c| !c.http_method.is_empty()).count(),
        "api chunks assembled"
    );
    chunks
}

/// First inline code span of the form `` `VERB /path` ``.
pub fn extract_endpoint(content: &str) -> Option<Endpoint> {
    static ENDPOINT_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"`(GET|POST|PATCH|DELETE|PUT)\s+([^\s`]+)`").expect("valid regex")
    });

    ENDPOINT_RE.captures(content).map(|caps| Endpoint {
        method: caps[1].to_string(),
        path: caps[2].to_string(),
    })
}

fn non_blank(sections: Vec<Section>) -> impl Iterator<Item = (usize, Section)> {
    sections
        .into_iter()
        .filter(|s| !s.text.trim().is_empty())
        .enumerate()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
