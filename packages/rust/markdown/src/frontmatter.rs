//! Leading `---` metadata block extraction.
//!
//! Only flat `key: value` lines are understood. Anything richer (lists,
//! nested maps) is skipped line by line, and a block without a closing
//! delimiter is treated as ordinary body text.

use std::collections::BTreeMap;

const DELIMITER: &str = "---";

/// Frontmatter fields plus the body that follows the block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter<'a> {
    /// Parsed fields. Later duplicates overwrite earlier ones.
    pub fields: BTreeMap<String, String>,
    /// Everything after the closing delimiter, or the whole input when no
    /// well-formed block was found.
    pub body: &'a str,
}

impl Frontmatter<'_> {
    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The `title` field, if present and non-empty.
    pub fn title(&self) -> Option<&str> {
        self.get("title").filter(|t| !t.is_empty())
    }
}

/// Split `text` into frontmatter fields and the remaining body.
///
/// Expects LF line endings. Never fails: malformed input yields empty fields
/// and the original text as the body.
pub fn extract_frontmatter(text: &str) -> Frontmatter<'_> {
    let not_found = Frontmatter {
        fields: BTreeMap::new(),
        body: text,
    };

    let Some(rest) = text
        .strip_prefix(DELIMITER)
        .and_then(|r| r.trim_start_matches([' ', '\t']).strip_prefix('\n'))
    else {
        return not_found;
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            let block = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Frontmatter {
                fields: parse_fields(block),
                body,
            };
        }
        offset += line.len();
    }

    not_found
}

fn parse_fields(block: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for line in block.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        fields.insert(key.trim().to_string(), unquote(value.trim()).to_string());
    }
    fields
}

/// Remove one layer of matching `"` or `'` quotes.
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fields_and_body() {
        let text = "---\ntitle: \"Getting Started\"\nsidebar_position: 3\n---\n# Hello\n";
        let fm = extract_frontmatter(text);

        assert_eq!(fm.get("title"), Some("Getting Started"));
        assert_eq!(fm.get("sidebar_position"), Some("3"));
        assert_eq!(fm.body, "# Hello\n");
    }

    #[test]
    fn no_block_returns_input() {
        let text = "# Title\n\nBody";
        let fm = extract_frontmatter(text);
        assert!(fm.fields.is_empty());
        assert_eq!(fm.body, text);
    }

    #[test]
    fn unterminated_block_is_ignored() {
        let text = "---\ntitle: Broken\n\n# Heading\n";
        let fm = extract_frontmatter(text);
        assert!(fm.fields.is_empty());
        assert_eq!(fm.body, text);
    }

    #[test]
    fn delimiter_must_open_the_document() {
        let text = "\n---\ntitle: Late\n---\nBody";
        let fm = extract_frontmatter(text);
        assert!(fm.fields.is_empty());
        assert_eq!(fm.body, text);
    }

    #[test]
    fn lines_without_colon_are_skipped() {
        let text = "---\ntags\n  - one\ndescription: A page\n---\nBody";
        let fm = extract_frontmatter(text);
        assert_eq!(fm.fields.len(), 1);
        assert_eq!(fm.get("description"), Some("A page"));
    }

    #[test]
    fn value_keeps_later_colons() {
        let fm = extract_frontmatter("---\nslug: /docs:intro\n---\n");
        assert_eq!(fm.get("slug"), Some("/docs:intro"));
        assert_eq!(fm.body, "");
    }

    #[test]
    fn duplicate_keys_last_wins() {
        let fm = extract_frontmatter("---\ntitle: First\ntitle: Second\n---\nBody");
        assert_eq!(fm.title(), Some("Second"));
    }

    #[test]
    fn strips_one_layer_of_matching_quotes() {
        let fm = extract_frontmatter("---\na: 'single'\nb: \"'nested'\"\nc: \"unbalanced'\n---\n");
        assert_eq!(fm.get("a"), Some("single"));
        assert_eq!(fm.get("b"), Some("'nested'"));
        assert_eq!(fm.get("c"), Some("\"unbalanced'"));
    }

    #[test]
    fn empty_title_is_absent() {
        let fm = extract_frontmatter("---\ntitle: \"\"\n---\nBody");
        assert_eq!(fm.get("title"), Some(""));
        assert_eq!(fm.title(), None);
    }

    #[test]
    fn empty_block_and_closing_at_eof() {
        let fm = extract_frontmatter("---\n---\nBody");
        assert!(fm.fields.is_empty());
        assert_eq!(fm.body, "Body");

        let fm = extract_frontmatter("---\nid: intro\n---");
        assert_eq!(fm.get("id"), Some("intro"));
        assert_eq!(fm.body, "");
    }
}
