//! Heading-aware splitting of normalized Markdown.
//!
//! A [`HeadingSplitter`] cuts text at heading lines up to a configured depth
//! and tags every [`Section`] with the [`HeadingPath`] active at that point.
//! Sections tile the input exactly: concatenating their `text` gives back
//! the original string.

use std::collections::BTreeMap;

use docprep_shared::MAX_HEADING_LEVEL;
use tracing::{debug, warn};

use crate::CodeFence;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Structural problems that prevent a heading split.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SplitError {
    #[error("heading depth must be between 1 and 6, got {0}")]
    InvalidDepth(usize),

    #[error("sections cover {covered} of {expected} bytes")]
    Incomplete { covered: usize, expected: usize },
}

// ---------------------------------------------------------------------------
// HeadingPath
// ---------------------------------------------------------------------------

/// The most recent heading text at each level `1..=depth`.
///
/// Entering a heading at level L sets slot L and clears every deeper slot;
/// shallower slots are kept. Skipped levels stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingPath {
    slots: Vec<Option<String>>,
}

impl HeadingPath {
    /// An empty path tracking `depth` levels.
    pub fn new(depth: usize) -> Self {
        Self {
            slots: vec![None; depth],
        }
    }

    fn enter(&mut self, level: usize, text: String) {
        self.slots[level - 1] = Some(text);
        for slot in &mut self.slots[level..] {
            *slot = None;
        }
    }

    /// Heading text at `level` (1-based), if any.
    pub fn get(&self, level: usize) -> Option<&str> {
        level
            .checked_sub(1)
            .and_then(|i| self.slots.get(i))
            .and_then(|slot| slot.as_deref())
    }

    /// Heading text at `level`, or `""`.
    pub fn text(&self, level: usize) -> &str {
        self.get(level).unwrap_or_default()
    }

    /// True when no level holds a heading.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Heading map keyed `"Header {level}"`, present levels only.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                slot.as_ref()
                    .map(|text| (format!("Header {}", i + 1), text.clone()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// A contiguous slice of the document starting at a heading (or at the
/// beginning of the text for the first section).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Exact source text, heading line included, untrimmed.
    pub text: String,
    /// Headings in effect for this section.
    pub path: HeadingPath,
    /// Level of the heading that opened this section.
    pub level: Option<usize>,
}

// ---------------------------------------------------------------------------
// Splitter
// ---------------------------------------------------------------------------

/// Splits Markdown at `#`..`#{depth}` headings outside fenced code.
#[derive(Debug, Clone)]
pub struct HeadingSplitter {
    depth: usize,
    merge_heading_only: bool,
}

impl HeadingSplitter {
    /// Splitter for headings of level `1..=depth`.
    pub fn new(depth: usize) -> Result<Self, SplitError> {
        if !(1..=MAX_HEADING_LEVEL).contains(&depth) {
            return Err(SplitError::InvalidDepth(depth));
        }
        Ok(Self {
            depth,
            merge_heading_only: false,
        })
    }

    /// Fold a section that ends on its heading line into a directly following
    /// deeper section (`# Guide` immediately followed by `## Setup`). Chains
    /// like `# A`, `## B`, `### C` collapse into one section.
    pub fn merge_heading_only(mut self, merge: bool) -> Self {
        self.merge_heading_only = merge;
        self
    }

    /// Configured heading depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Split `text` into sections.
    pub fn split(&self, text: &str) -> Result<Vec<Section>, SplitError> {
        let mut sections = Vec::new();
        let mut path = HeadingPath::new(self.depth);
        let mut fence = CodeFence::default();
        let mut level = None;
        let mut start = 0;
        let mut offset = 0;

        for line in text.split_inclusive('\n') {
            if !fence.advance(line) {
                if let Some((heading_level, heading)) = self.parse_heading(line) {
                    if offset > start {
                        sections.push(Section {
                            text: text[start..offset].to_string(),
                            path: path.clone(),
                            level,
                        });
                    }
                    path.enter(heading_level, heading);
                    level = Some(heading_level);
                    start = offset;
                }
            }
            offset += line.len();
        }

        if let Some(line) = fence.unclosed() {
            debug!(line, "code fence never closes, rest of text treated as code");
        }

        if start < text.len() {
            sections.push(Section {
                text: text[start..].to_string(),
                path,
                level,
            });
        }

        let covered: usize = sections.iter().map(|s| s.text.len()).sum();
        if covered != text.len() {
            return Err(SplitError::Incomplete {
                covered,
                expected: text.len(),
            });
        }

        if self.merge_heading_only {
            sections = self.merge_heading_only_sections(sections);
        }

        debug!(sections = sections.len(), depth = self.depth, "heading split complete");
        Ok(sections)
    }

    /// Split, falling back to one whole-document chunk on structural errors.
    pub fn chunk(&self, text: &str) -> Chunking {
        Chunking::from_split(text, self.split(text))
    }

    /// Parse a heading line into `(level, text)` if it is a split point.
    fn parse_heading(&self, line: &str) -> Option<(usize, String)> {
        let trimmed = line.trim();
        let hashes = trimmed.bytes().take_while(|&b| b == b'#').count();
        if hashes == 0 || hashes > self.depth {
            return None;
        }

        let rest = &trimmed[hashes..];
        if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
            return None;
        }
        Some((hashes, rest.trim().to_string()))
    }

    /// Fold each section into the one before it while the previous section
    /// ends on a heading line and the next one goes deeper.
    fn merge_heading_only_sections(&self, sections: Vec<Section>) -> Vec<Section> {
        let mut merged: Vec<Section> = Vec::with_capacity(sections.len());

        for section in sections {
            if let Some(prev) = merged.last_mut() {
                let deeper = matches!(
                    (prev.level, section.level),
                    (Some(outer), Some(inner)) if inner > outer
                );
                if deeper && self.ends_with_heading(&prev.text) {
                    prev.text.push_str(&section.text);
                    prev.path = section.path;
                    prev.level = section.level;
                    continue;
                }
            }
            merged.push(section);
        }

        merged
    }

    fn ends_with_heading(&self, text: &str) -> bool {
        text.lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .is_some_and(|line| self.parse_heading(line).is_some())
    }
}

// ---------------------------------------------------------------------------
// Chunking result
// ---------------------------------------------------------------------------

/// Outcome of [`HeadingSplitter::chunk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunking {
    /// The split succeeded.
    Sections(Vec<Section>),
    /// The split failed; the whole text is kept as one chunk.
    Fallback { content: String, error: SplitError },
}

impl Chunking {
    /// Wrap a split result, keeping the whole text as one chunk on error.
    pub fn from_split(text: &str, result: Result<Vec<Section>, SplitError>) -> Self {
        match result {
            Ok(sections) => Self::Sections(sections),
            Err(error) => {
                warn!(%error, "heading split failed, keeping document as a single chunk");
                Self::Fallback {
                    content: text.to_string(),
                    error,
                }
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Flatten into sections. A fallback becomes one section with an empty path.
    pub fn into_sections(self) -> Vec<Section> {
        match self {
            Self::Sections(sections) => sections,
            Self::Fallback { content, .. } => vec![Section {
                text: content,
                path: HeadingPath::default(),
                level: None,
            }],
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(depth: usize) -> HeadingSplitter {
        HeadingSplitter::new(depth).unwrap()
    }

    fn concat(sections: &[Section]) -> String {
        sections.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn splits_at_each_heading() {
        let text = "Intro line\n\n# Guide\nWelcome\n\n## Setup\nInstall\n\n## Usage\nRun\n";
        let sections = splitter(4).split(text).unwrap();

        assert_eq!(sections.len(), 4);
        assert_eq!(sections[0].text, "Intro line\n\n");
        assert!(sections[0].path.is_empty());
        assert_eq!(sections[0].level, None);

        assert_eq!(sections[1].text, "# Guide\nWelcome\n\n");
        assert_eq!(sections[1].path.text(1), "Guide");

        assert_eq!(sections[2].path.text(1), "Guide");
        assert_eq!(sections[2].path.text(2), "Setup");
        assert_eq!(sections[3].path.text(2), "Usage");
        assert_eq!(sections[3].level, Some(2));
    }

    #[test]
    fn sections_reconstruct_input() {
        let text = "# A\n\ntext\n### C\n```\n# not a heading\n```\n## B\nmore\n#### D\nend";
        let sections = splitter(4).split(text).unwrap();
        assert_eq!(concat(&sections), text);
    }

    #[test]
    fn shallower_heading_clears_deeper_levels() {
        let text = "# One\n## Two\n### Three\nx\n## Back Up\ny\n# Reset\nz\n";
        let sections = splitter(3).split(text).unwrap();

        let back_up = &sections[3];
        assert_eq!(back_up.path.text(1), "One");
        assert_eq!(back_up.path.text(2), "Back Up");
        assert_eq!(back_up.path.get(3), None);

        let reset = &sections[4];
        assert_eq!(reset.path.text(1), "Reset");
        assert!(reset.path.get(2).is_none());
    }

    #[test]
    fn skipped_level_stays_empty() {
        let text = "# Top\n### Deep\nbody\n";
        let sections = splitter(4).split(text).unwrap();

        let deep = &sections[1];
        assert_eq!(deep.path.text(1), "Top");
        assert_eq!(deep.path.text(2), "");
        assert_eq!(deep.path.text(3), "Deep");
        assert_eq!(
            deep.path.to_map(),
            BTreeMap::from([
                ("Header 1".to_string(), "Top".to_string()),
                ("Header 3".to_string(), "Deep".to_string()),
            ])
        );
    }

    #[test]
    fn headings_deeper_than_depth_are_text() {
        let text = "## Endpoint\n#### Params\nlist\n";
        let sections = splitter(3).split(text).unwrap();
        assert_eq!(sections.len(), 1);
        assert!(sections[0].text.contains("#### Params"));
    }

    #[test]
    fn hashtags_are_not_headings() {
        let sections = splitter(4).split("#hashtag\n#\n").unwrap();
        // A bare `#` is an empty heading.
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].level, Some(1));
        assert_eq!(sections[1].path.text(1), "");
    }

    #[test]
    fn headings_in_code_fences_do_not_split() {
        let text = "# Script\n```bash\n# comment\n## another\n```\nafter\n";
        let sections = splitter(4).split(text).unwrap();
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn unclosed_fence_runs_to_end_of_text() {
        let text = "# A\n\n```js\nlet x;\n# B\n";
        let sections = splitter(4).split(text).unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, text);
        assert_eq!(sections[0].path.text(1), "A");
    }

    #[test]
    fn unclosed_fence_keeps_earlier_headings() {
        let chunking = splitter(4).chunk("# Intro\nhello\n## Part\nsee below\n```\ncode\n");
        assert!(!chunking.is_fallback());

        let sections = chunking.into_sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].path.text(1), "Intro");
        assert_eq!(sections[1].path.text(1), "Intro");
        assert_eq!(sections[1].path.text(2), "Part");
        assert!(sections[1].text.ends_with("```\ncode\n"));
    }

    #[test]
    fn failed_split_keeps_whole_document() {
        let text = "# A\n~~~\nno end";
        let error = SplitError::Incomplete {
            covered: 4,
            expected: text.len(),
        };
        let chunking = Chunking::from_split(text, Err(error.clone()));
        assert!(chunking.is_fallback());
        assert!(matches!(&chunking, Chunking::Fallback { error: e, .. } if *e == error));

        let sections = chunking.into_sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, text);
        assert!(sections[0].path.is_empty());
        assert_eq!(sections[0].path.text(1), "");
    }

    #[test]
    fn empty_text_has_no_sections() {
        assert!(splitter(4).split("").unwrap().is_empty());
    }

    #[test]
    fn invalid_depth_rejected() {
        assert_eq!(HeadingSplitter::new(0).unwrap_err(), SplitError::InvalidDepth(0));
        assert!(HeadingSplitter::new(7).is_err());
    }

    #[test]
    fn merge_heading_only_folds_into_deeper_section() {
        let text = "# Guide\n\n## Setup\nInstall it\n## Usage\nRun it\n";
        let sections = splitter(4).merge_heading_only(true).split(text).unwrap();

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].text, "# Guide\n\n## Setup\nInstall it\n");
        assert_eq!(sections[0].path.text(1), "Guide");
        assert_eq!(sections[0].path.text(2), "Setup");
        assert_eq!(concat(&sections), text);
    }

    #[test]
    fn merge_heading_only_follows_a_chain_of_headings() {
        let text = "# A\n## B\n### C\ntext\n";
        let sections = splitter(4).merge_heading_only(true).split(text).unwrap();

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, text);
        assert_eq!(sections[0].level, Some(3));
        assert_eq!(sections[0].path.text(1), "A");
        assert_eq!(sections[0].path.text(2), "B");
        assert_eq!(sections[0].path.text(3), "C");
    }

    #[test]
    fn merge_heading_only_stops_after_body_text() {
        let text = "# A\n## B\nintro\n### C\ntext\n";
        let sections = splitter(4).merge_heading_only(true).split(text).unwrap();

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].text, "# A\n## B\nintro\n");
        assert_eq!(sections[1].text, "### C\ntext\n");
    }

    #[test]
    fn merge_heading_only_keeps_sibling_headings_apart() {
        let text = "## Empty\n## Next\nbody\n";
        let sections = splitter(4).merge_heading_only(true).split(text).unwrap();
        assert_eq!(sections.len(), 2);
    }
}
