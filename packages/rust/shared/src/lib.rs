//! Shared types, error model, and configuration for docprep.
//!
//! This crate is the foundation depended on by all other docprep crates.
//! It provides:
//! - [`DocPrepError`], the unified error type
//! - Chunk records ([`DocChunk`], [`ApiChunk`], [`ChunkId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, DocsConfig, MAX_HEADING_LEVEL, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_heading_levels,
};
pub use error::{DocPrepError, Result};
pub use types::{ApiChunk, ChunkId, DocChunk};
