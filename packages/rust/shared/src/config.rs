//! Application configuration for docprep.
//!
//! User config lives at `~/.docprep/docprep.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocPrepError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docprep.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docprep";

/// Deepest heading level Markdown supports.
pub const MAX_HEADING_LEVEL: usize = 6;

// ---------------------------------------------------------------------------
// Config structs (matching docprep.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// General documentation corpus.
    #[serde(default)]
    pub docs: DocsConfig,

    /// API reference document.
    #[serde(default)]
    pub api: ApiConfig,
}

/// `[docs]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    /// Directory scanned recursively for documentation files.
    #[serde(default = "default_docs_root")]
    pub root_dir: String,

    /// JSON Lines output; the pretty array goes next to it with a `.json` extension.
    #[serde(default = "default_docs_output")]
    pub output_file: String,

    /// File extensions to pick up, without the leading dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Deepest heading level that starts a new chunk.
    #[serde(default = "default_docs_heading_levels")]
    pub heading_levels: usize,

    /// Fold heading-only chunks into the deeper section that follows them.
    #[serde(default)]
    pub merge_heading_only: bool,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            root_dir: default_docs_root(),
            output_file: default_docs_output(),
            extensions: default_extensions(),
            heading_levels: default_docs_heading_levels(),
            merge_heading_only: false,
        }
    }
}

fn default_docs_root() -> String {
    "data/raw/docs".into()
}
fn default_docs_output() -> String {
    "data/documentation.jsonl".into()
}
fn default_extensions() -> Vec<String> {
    vec!["md".into(), "mdx".into()]
}
fn default_docs_heading_levels() -> usize {
    4
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// The single API reference Markdown file.
    #[serde(default = "default_api_input")]
    pub input_file: String,

    /// JSON Lines output; the pretty array goes next to it with a `.json` extension.
    #[serde(default = "default_api_output")]
    pub output_file: String,

    /// Value recorded in `file_path` (defaults to the input's file name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_label: Option<String>,

    /// Title used when neither frontmatter nor an H1 provides one.
    #[serde(default = "default_fallback_title")]
    pub fallback_title: String,

    /// Deepest heading level that starts a new chunk.
    #[serde(default = "default_api_heading_levels")]
    pub heading_levels: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            input_file: default_api_input(),
            output_file: default_api_output(),
            file_label: None,
            fallback_title: default_fallback_title(),
            heading_levels: default_api_heading_levels(),
        }
    }
}

fn default_api_input() -> String {
    "data/api-docs.md".into()
}
fn default_api_output() -> String {
    "data/api_docs_chunked.jsonl".into()
}
fn default_fallback_title() -> String {
    "API Reference".into()
}
fn default_api_heading_levels() -> usize {
    3
}

/// Check that a heading depth is usable as a split configuration.
pub fn validate_heading_levels(levels: usize) -> Result<()> {
    if (1..=MAX_HEADING_LEVEL).contains(&levels) {
        Ok(())
    } else {
        Err(DocPrepError::validation(format!(
            "heading_levels must be between 1 and {MAX_HEADING_LEVEL}, got {levels}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docprep/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocPrepError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docprep/docprep.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocPrepError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        DocPrepError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    validate_heading_levels(config.docs.heading_levels)?;
    validate_heading_levels(config.api.heading_levels)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocPrepError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocPrepError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocPrepError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
