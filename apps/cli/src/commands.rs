//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use docprep_core::pipeline::{
    self, ApiPipelineConfig, ApiRunReport, DocsPipelineConfig, DocsRunReport, ProgressReporter,
};
use docprep_shared::{AppConfig, init_config, load_config, load_config_from};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docprep: turn Markdown documentation into embedding-ready chunks.
#[derive(Parser)]
#[command(
    name = "docprep",
    version,
    about = "Chunk Markdown documentation and API references into JSON Lines records.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.docprep/docprep.toml).
    #[arg(long, env = "DOCPREP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Chunk a documentation tree of .md/.mdx files.
    Docs {
        /// Documentation root directory.
        #[arg(long)]
        root: Option<PathBuf>,

        /// JSON Lines output file (a .json array is written next to it).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// File extensions to include (comma-separated, e.g. md,mdx).
        #[arg(long, value_delimiter = ',')]
        ext: Vec<String>,

        /// Deepest heading level that starts a new chunk (1-6).
        #[arg(long)]
        heading_levels: Option<usize>,

        /// Merge heading-only sections into the following subsection.
        #[arg(long)]
        merge_heading_only: bool,
    },

    /// Chunk a single API reference document.
    Api {
        /// API reference Markdown file.
        #[arg(long)]
        input: Option<PathBuf>,

        /// JSON Lines output file (a .json array is written next to it).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Title used when the document has none.
        #[arg(long)]
        title: Option<String>,

        /// Value stored as each chunk's file_path (defaults to the input file name).
        #[arg(long)]
        label: Option<String>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docprep=info",
        1 => "docprep=debug",
        _ => "docprep=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Docs {
            root,
            out,
            ext,
            heading_levels,
            merge_heading_only,
        } => {
            let mut config = resolve_config(config_path.as_deref())?;
            if let Some(root) = root {
                config.docs.root_dir = root.to_string_lossy().into_owned();
            }
            if let Some(out) = out {
                config.docs.output_file = out.to_string_lossy().into_owned();
            }
            if !ext.is_empty() {
                config.docs.extensions = ext;
            }
            if let Some(levels) = heading_levels {
                config.docs.heading_levels = levels;
            }
            config.docs.merge_heading_only |= merge_heading_only;
            cmd_docs(&config)
        }
        Command::Api {
            input,
            out,
            title,
            label,
        } => {
            let mut config = resolve_config(config_path.as_deref())?;
            if let Some(input) = input {
                config.api.input_file = input.to_string_lossy().into_owned();
            }
            if let Some(out) = out {
                config.api.output_file = out.to_string_lossy().into_owned();
            }
            if let Some(title) = title {
                config.api.fallback_title = title;
            }
            if label.is_some() {
                config.api.file_label = label;
            }
            cmd_api(&config)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)
            .wrap_err_with(|| format!("loading config from {}", path.display()))?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_docs(config: &AppConfig) -> Result<()> {
    let docs_config = DocsPipelineConfig::from(config);
    info!(
        root = %docs_config.root_dir.display(),
        out = %docs_config.output_file.display(),
        extensions = ?docs_config.extensions,
        "chunking documentation"
    );

    let reporter = CliProgress::new();
    let report = match pipeline::run_docs(&docs_config, &reporter) {
        Ok(report) => report,
        Err(e) => {
            reporter.spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    print_docs_summary(&report)
}

fn cmd_api(config: &AppConfig) -> Result<()> {
    let api_config = ApiPipelineConfig::from(config);
    info!(
        input = %api_config.input_file.display(),
        out = %api_config.output_file.display(),
        label = %api_config.file_label,
        "chunking API reference"
    );

    let report = pipeline::run_api(&api_config)?;
    print_api_summary(&report)
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

const PREVIEW_CHARS: usize = 200;

fn print_docs_summary(report: &DocsRunReport) -> Result<()> {
    println!();
    println!("  Documentation chunked!");
    println!("  Files:      {}", report.discovered);
    for (ext, count) in &report.by_extension {
        println!("    .{ext:<8}{count}");
    }
    println!("  Processed:  {}", report.processed);
    println!("  Failed:     {}", report.failed.len());
    for failure in &report.failed {
        println!("    {}: {}", failure.path.display(), failure.message);
    }
    println!("  Chunks:     {}", report.chunks.len());
    println!("  Per file:   {:.1}", report.average_chunks_per_file());
    if report.fallbacks > 0 {
        println!("  Unsplit:    {}", report.fallbacks);
    }
    print_outputs(report.outputs.as_ref());
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());

    if let Some(sample) = report.chunks.first() {
        print_sample(sample, &sample.content)?;
    }
    println!();
    Ok(())
}

fn print_api_summary(report: &ApiRunReport) -> Result<()> {
    println!();
    println!("  API reference chunked!");
    println!("  Title:      {}", report.title);
    println!("  Chunks:     {}", report.chunks.len());
    println!("  Endpoints:  {}", report.endpoint_count());
    if report.fallback {
        println!("  Unsplit:    heading split failed, kept as one chunk");
    }
    print_outputs(report.outputs.as_ref());
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());

    if let Some(sample) = report.chunks.first() {
        print_sample(sample, &sample.content)?;
    }
    println!();
    Ok(())
}

fn print_outputs(outputs: Option<&docprep_core::output::OutputPaths>) {
    if let Some(outputs) = outputs {
        println!("  Output:     {}", outputs.jsonl.display());
        println!("              {}", outputs.json.display());
    }
}

/// Print one record with its content shortened to a preview.
fn print_sample<T: Serialize>(record: &T, content: &str) -> Result<()> {
    let mut value = serde_json::to_value(record)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("content".into(), preview(content, PREVIEW_CHARS).into());
    }
    println!();
    println!("  Sample record:");
    for line in serde_json::to_string_pretty(&value)?.lines() {
        println!("  {line}");
    }
    Ok(())
}

/// First `max` characters of `text`, with `...` when truncated.
fn preview(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid progress template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_processed(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Chunking [{current}/{total}] {path}"));
    }

    fn file_failed(&self, path: &str, message: &str) {
        self.spinner.println(format!("  skipped {path}: {message}"));
    }

    fn done(&self, _report: &DocsRunReport) {
        self.spinner.finish_and_clear();
    }
}
