//! Corpus drivers: documentation tree → chunks, and API reference → chunks.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use docprep_markdown::{HeadingSplitter, prepare_api_document, prepare_document};
use docprep_shared::{
    ApiChunk, AppConfig, DocChunk, DocPrepError, Result, validate_heading_levels,
};

use crate::assembler::{self, ApiContext, DocContext};
use crate::output::{self, OutputPaths};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Runtime configuration for the documentation pipeline.
#[derive(Debug, Clone)]
pub struct DocsPipelineConfig {
    /// Corpus root, walked recursively.
    pub root_dir: PathBuf,
    /// JSON Lines output; the `.json` companion is derived from it.
    pub output_file: PathBuf,
    /// Lowercase extensions without the leading dot.
    pub extensions: Vec<String>,
    /// Deepest heading level that starts a chunk.
    pub heading_levels: usize,
    /// Fold heading-only sections into the next deeper section.
    pub merge_heading_only: bool,
}

impl From<&AppConfig> for DocsPipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            root_dir: PathBuf::from(&config.docs.root_dir),
            output_file: PathBuf::from(&config.docs.output_file),
            extensions: config
                .docs
                .extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            heading_levels: config.docs.heading_levels,
            merge_heading_only: config.docs.merge_heading_only,
        }
    }
}

impl DocsPipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.extensions.is_empty() {
            return Err(DocPrepError::validation(
                "at least one file extension is required",
            ));
        }
        validate_heading_levels(self.heading_levels)
    }
}

/// Runtime configuration for the API reference pipeline.
#[derive(Debug, Clone)]
pub struct ApiPipelineConfig {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    /// Value stored in each chunk's `file_path` and used to derive ids.
    pub file_label: String,
    /// Title used when neither frontmatter nor an H1 provides one.
    pub fallback_title: String,
    pub heading_levels: usize,
}

impl From<&AppConfig> for ApiPipelineConfig {
    fn from(config: &AppConfig) -> Self {
        let input_file = PathBuf::from(&config.api.input_file);
        let file_label = config
            .api
            .file_label
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| {
                input_file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| config.api.input_file.clone())
            });

        Self {
            input_file,
            output_file: PathBuf::from(&config.api.output_file),
            file_label,
            fallback_title: config.api.fallback_title.clone(),
            heading_levels: config.api.heading_levels,
        }
    }
}

impl ApiPipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.file_label.trim().is_empty() {
            return Err(DocPrepError::validation("file label must not be empty"));
        }
        validate_heading_levels(self.heading_levels)
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a file has been chunked.
    fn file_processed(&self, path: &str, current: usize, total: usize);
    /// Called when a file is skipped because of an error.
    fn file_failed(&self, path: &str, message: &str);
    /// Called when the run completes.
    fn done(&self, report: &DocsRunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_processed(&self, _path: &str, _current: usize, _total: usize) {}
    fn file_failed(&self, _path: &str, _message: &str) {}
    fn done(&self, _report: &DocsRunReport) {}
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// A document that was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub path: PathBuf,
    pub message: String,
}

/// Result of a documentation run.
#[derive(Debug, Clone)]
pub struct DocsRunReport {
    /// Files matching the extension filter.
    pub discovered: usize,
    /// Files successfully chunked.
    pub processed: usize,
    pub failed: Vec<FailedFile>,
    /// Discovered files per lowercase extension.
    pub by_extension: BTreeMap<String, usize>,
    pub chunks: Vec<DocChunk>,
    /// Documents kept whole because heading splitting failed.
    pub fallbacks: usize,
    pub elapsed: Duration,
    /// Set once outputs have been written.
    pub outputs: Option<OutputPaths>,
}

impl DocsRunReport {
    pub fn average_chunks_per_file(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            self.chunks.len() as f64 / self.processed as f64
        }
    }
}

/// Result of an API reference run.
#[derive(Debug, Clone)]
pub struct ApiRunReport {
    pub title: String,
    pub chunks: Vec<ApiChunk>,
    /// Whether heading splitting failed and the document was kept whole.
    pub fallback: bool,
    pub elapsed: Duration,
    pub outputs: Option<OutputPaths>,
}

impl ApiRunReport {
    /// Number of chunks with a detected endpoint.
    pub fn endpoint_count(&self) -> usize {
        self.chunks
            .iter()
            .filter(|c| !c.http_method.is_empty())
            .count()
    }
}

// ---------------------------------------------------------------------------
// Documentation pipeline
// ---------------------------------------------------------------------------

/// Recursively list files under `root` whose extension is in `extensions`
/// (case-insensitive), in path order.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn discover_files(root: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(DocPrepError::missing_input(root));
    }
    if !root.is_dir() {
        return Err(DocPrepError::validation(format!(
            "documentation root {} is not a directory",
            root.display()
        )));
    }

    let wanted: BTreeSet<String> = extensions.iter().map(|e| e.to_ascii_lowercase()).collect();
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if extension_of(entry.path()).is_some_and(|ext| wanted.contains(&ext)) {
            files.push(entry.into_path());
        }
    }

    debug!(count = files.len(), "files discovered");
    Ok(files)
}

/// Discover, prepare, split and assemble every document under the root.
/// Does not write outputs.
#[instrument(skip_all, fields(root = %config.root_dir.display()))]
pub fn process_docs(
    config: &DocsPipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<DocsRunReport> {
    let start = Instant::now();
    config.validate()?;

    let splitter = HeadingSplitter::new(config.heading_levels)
        .map_err(|e| DocPrepError::validation(e.to_string()))?
        .merge_heading_only(config.merge_heading_only);

    progress.phase("Discovering files");
    let files = discover_files(&config.root_dir, &config.extensions)?;
    info!(files = files.len(), "starting documentation run");

    let mut by_extension = BTreeMap::new();
    for file in &files {
        if let Some(ext) = extension_of(file) {
            *by_extension.entry(ext).or_insert(0) += 1;
        }
    }

    progress.phase("Chunking documents");
    let total = files.len();
    let mut chunks = Vec::new();
    let mut failed = Vec::new();
    let mut processed = 0;
    let mut fallbacks = 0;

    for (i, path) in files.iter().enumerate() {
        let relative = relative_label(&config.root_dir, path);
        match process_doc_file(path, &relative, &splitter) {
            Ok(doc) => {
                debug!(file = %relative, chunks = doc.chunks.len(), "document chunked");
                processed += 1;
                if doc.fallback {
                    fallbacks += 1;
                }
                chunks.extend(doc.chunks);
                progress.file_processed(&relative, i + 1, total);
            }
            Err(e) => {
                let message = e.to_string();
                warn!(file = %relative, error = %message, "skipping document");
                progress.file_failed(&relative, &message);
                failed.push(FailedFile {
                    path: path.clone(),
                    message,
                });
            }
        }
    }

    let report = DocsRunReport {
        discovered: total,
        processed,
        failed,
        by_extension,
        chunks,
        fallbacks,
        elapsed: start.elapsed(),
        outputs: None,
    };

    info!(
        discovered = report.discovered,
        processed = report.processed,
        failed = report.failed.len(),
        chunks = report.chunks.len(),
        "documentation chunked"
    );
    Ok(report)
}

/// Full documentation run: process the corpus, then write both outputs.
pub fn run_docs(
    config: &DocsPipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<DocsRunReport> {
    let start = Instant::now();
    let mut report = process_docs(config, progress)?;

    progress.phase("Writing output");
    report.outputs = Some(output::write_outputs(&config.output_file, &report.chunks)?);
    report.elapsed = start.elapsed();

    progress.done(&report);
    Ok(report)
}

struct ProcessedDoc {
    chunks: Vec<DocChunk>,
    fallback: bool,
}

fn process_doc_file(
    path: &Path,
    relative: &str,
    splitter: &HeadingSplitter,
) -> Result<ProcessedDoc> {
    let raw = std::fs::read_to_string(path).map_err(|e| DocPrepError::io(path, e))?;
    let absolute = std::path::absolute(path).map_err(|e| DocPrepError::io(path, e))?;
    let absolute = absolute.to_string_lossy();

    let prepared = prepare_document(&raw);
    let chunking = splitter.chunk(&prepared.body);
    let fallback = chunking.is_fallback();

    let ctx = DocContext {
        relative_path: relative,
        absolute_path: &absolute,
        title: &prepared.title,
    };
    let chunks = assembler::assemble_doc_chunks(chunking.into_sections(), &ctx, Utc::now())?;

    Ok(ProcessedDoc { chunks, fallback })
}

// ---------------------------------------------------------------------------
// API pipeline
// ---------------------------------------------------------------------------

/// Prepare, split and assemble the API reference. Does not write outputs.
#[instrument(skip_all, fields(input = %config.input_file.display()))]
pub fn process_api(config: &ApiPipelineConfig) -> Result<ApiRunReport> {
    let start = Instant::now();
    config.validate()?;

    if !config.input_file.is_file() {
        return Err(DocPrepError::missing_input(&config.input_file));
    }

    let splitter = HeadingSplitter::new(config.heading_levels)
        .map_err(|e| DocPrepError::validation(e.to_string()))?;

    let raw = std::fs::read_to_string(&config.input_file)
        .map_err(|e| DocPrepError::io(&config.input_file, e))?;
    let prepared = prepare_api_document(&raw, &config.fallback_title);

    let chunking = splitter.chunk(&prepared.body);
    let fallback = chunking.is_fallback();

    let ctx = ApiContext {
        file_path: &config.file_label,
        title: &prepared.title,
    };
    let chunks = assembler::assemble_api_chunks(chunking.into_sections(), &ctx, Utc::now());

    let report = ApiRunReport {
        title: prepared.title,
        chunks,
        fallback,
        elapsed: start.elapsed(),
        outputs: None,
    };

    info!(
        title = %report.title,
        chunks = report.chunks.len(),
        endpoints = report.endpoint_count(),
        "api reference chunked"
    );
    Ok(report)
}

/// Full API run: process the reference, then write both outputs.
pub fn run_api(config: &ApiPipelineConfig) -> Result<ApiRunReport> {
    let start = Instant::now();
    let mut report = process_api(config)?;
    report.outputs = Some(output::write_outputs(&config.output_file, &report.chunks)?);
    report.elapsed = start.elapsed();
    Ok(report)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// `/`-separated path of `path` relative to `root`.
fn relative_label(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
