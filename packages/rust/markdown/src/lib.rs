//! Markdown/MDX normalization and heading-aware splitting.
//!
//! Turns a raw documentation page into clean Markdown: frontmatter is pulled
//! off, framework markup (imports, tabs, cards, images, callouts, wrapper
//! tags) is flattened by a chain of regex passes, and a title is resolved.
//! The [`splitter`] then cuts the normalized text at heading boundaries.

pub mod cleanup;
pub mod frontmatter;
pub mod splitter;
pub mod title;

use tracing::{debug, instrument};

pub use cleanup::{NamedPass, Normalizer};
pub use frontmatter::{Frontmatter, extract_frontmatter};
pub use splitter::{Chunking, HeadingPath, HeadingSplitter, Section, SplitError};
pub use title::{ensure_title_heading, first_h1, resolve_title};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A document after frontmatter extraction, normalization and title resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    /// Normalized Markdown body, trimmed. Ready for splitting.
    pub body: String,
    /// Resolved document title (may be empty for general docs).
    pub title: String,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Prepare a general documentation page (`.md` / `.mdx`).
///
/// 1. Normalizes line endings and extracts frontmatter
/// 2. Runs the [`Normalizer::docs`] pass list
/// 3. Prepends `# {title}` when the title came from frontmatter and the
///    source body (imports removed, markup not yet flattened) does not
///    already open with a heading
/// 4. Resolves the title (frontmatter, then first H1, then empty)
#[instrument(skip_all, fields(len = raw.len()))]
pub fn prepare_document(raw: &str) -> Prepared {
    let text = normalize_line_endings(raw);
    let frontmatter = extract_frontmatter(&text);

    let mut body = Normalizer::docs().run(frontmatter.body);
    if let Some(title) = frontmatter.title() {
        let source = cleanup::remove_imports(frontmatter.body);
        body = ensure_title_heading(title, &source, body);
    }

    let title = resolve_title(&frontmatter, &body).unwrap_or_default();

    debug!(
        title = %title,
        fields = frontmatter.fields.len(),
        body_len = body.len(),
        "document prepared"
    );

    Prepared { body, title }
}

/// Prepare the API reference document.
///
/// HTML headings are converted to Markdown before anything else; the title
/// falls back to `fallback_title` when neither frontmatter nor an H1 has one.
#[instrument(skip_all, fields(len = raw.len()))]
pub fn prepare_api_document(raw: &str, fallback_title: &str) -> Prepared {
    let text = normalize_line_endings(raw);
    let frontmatter = extract_frontmatter(&text);

    let body = Normalizer::api().run(frontmatter.body);
    let title = resolve_title(&frontmatter, &body).unwrap_or_else(|| fallback_title.to_string());

    debug!(title = %title, body_len = body.len(), "api document prepared");

    Prepared { body, title }
}

/// Convert CRLF and lone CR line endings to LF.
pub fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

// ---------------------------------------------------------------------------
// Code fence tracking
// ---------------------------------------------------------------------------

/// Line-by-line tracker for fenced code blocks (```` ``` ```` or `~~~`).
///
/// Passes that must leave code untouched feed every line through
/// [`CodeFence::advance`].
#[derive(Debug, Default)]
pub(crate) struct CodeFence {
    /// Fence character, run length, and 1-based line of the opener.
    open: Option<(char, usize, usize)>,
    line: usize,
}

impl CodeFence {
    /// Feed the next line. Returns `true` when the line belongs to a code
    /// block, fence lines included.
    pub(crate) fn advance(&mut self, line: &str) -> bool {
        self.line += 1;
        let trimmed = line.trim();

        match self.open {
            Some((ch, len, _)) => {
                let run = trimmed.chars().take_while(|&c| c == ch).count();
                if run >= len && trimmed[run * ch.len_utf8()..].trim().is_empty() {
                    self.open = None;
                }
                true
            }
            None => {
                let Some(ch) = trimmed.chars().next().filter(|c| *c == '`' || *c == '~') else {
                    return false;
                };
                let run = trimmed.chars().take_while(|&c| c == ch).count();
                if run < 3 {
                    return false;
                }
                // A backtick info string cannot contain backticks (``` `x` ``` is inline code).
                if ch == '`' && trimmed[run..].contains('`') {
                    return false;
                }
                self.open = Some((ch, run, self.line));
                true
            }
        }
    }

    /// Line number of a fence that is still open, if any.
    pub(crate) fn unclosed(&self) -> Option<usize> {
        self.open.map(|(_, _, line)| line)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
