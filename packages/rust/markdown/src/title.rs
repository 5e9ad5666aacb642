//! Document title resolution.

use std::sync::LazyLock;

use regex::Regex;

use crate::CodeFence;
use crate::frontmatter::Frontmatter;

/// Resolve a title: non-empty frontmatter `title`, else the first H1 in `body`.
pub fn resolve_title(frontmatter: &Frontmatter<'_>, body: &str) -> Option<String> {
    frontmatter
        .title()
        .map(str::to_string)
        .or_else(|| first_h1(body))
}

/// Text of the first `# ` heading outside fenced code, trimmed.
pub fn first_h1(body: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^#[ \t]+(.+)$").expect("valid regex"));

    let mut fence = CodeFence::default();
    body.lines()
        .filter(|line| !fence.advance(line))
        .filter_map(|line| H1_RE.captures(line.trim_end()))
        .map(|caps| caps[1].trim().to_string())
        .find(|text| !text.is_empty())
}

/// Prepend `# {title}` to `body` unless `source`, the text before markup
/// was flattened, already opens with a heading.
///
/// Headings generated from components (tab labels, card titles) do not
/// count, so a page opening with `<Tabs>` still gets its title heading.
pub fn ensure_title_heading(title: &str, source: &str, body: String) -> String {
    if source.trim_start().starts_with('#') {
        body
    } else {
        format!("# {title}\n\n{body}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::extract_frontmatter;

    #[test]
    fn frontmatter_title_wins() {
        let fm = extract_frontmatter("---\ntitle: From Meta\n---\n# From Body\n");
        assert_eq!(resolve_title(&fm, fm.body).as_deref(), Some("From Meta"));
    }

    #[test]
    fn falls_back_to_first_h1() {
        let fm = extract_frontmatter("Intro\n\n## Sub\n\n#   Real Title  \n\n# Second\n");
        assert_eq!(resolve_title(&fm, fm.body).as_deref(), Some("Real Title"));
    }

    #[test]
    fn empty_frontmatter_title_falls_back() {
        let fm = extract_frontmatter("---\ntitle: ''\n---\n# Body Title\n");
        assert_eq!(resolve_title(&fm, fm.body).as_deref(), Some("Body Title"));
    }

    #[test]
    fn no_title_anywhere() {
        let fm = extract_frontmatter("plain text\n#hashtag\n");
        assert_eq!(resolve_title(&fm, fm.body), None);
    }

    #[test]
    fn h1_inside_code_block_is_ignored() {
        let body = "```bash\n# install deps\nnpm i\n```\n\n# Install\n";
        assert_eq!(first_h1(body).as_deref(), Some("Install"));
    }

    #[test]
    fn ensure_title_heading_prepends() {
        assert_eq!(
            ensure_title_heading("My Doc", "Text", "Text".into()),
            "# My Doc\n\nText"
        );
    }

    #[test]
    fn ensure_title_heading_respects_any_heading_level() {
        let body = "## Existing\n\nText";
        assert_eq!(ensure_title_heading("My Doc", body, body.into()), body);
    }

    #[test]
    fn ensure_title_heading_ignores_generated_headings() {
        let source = "<Tabs>\n<TabItem value=\"a\">x</TabItem>\n</Tabs>";
        assert_eq!(
            ensure_title_heading("Guide", source, "### A\nx".into()),
            "# Guide\n\n### A\nx"
        );
    }
}
