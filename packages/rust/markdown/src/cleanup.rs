//! Markup normalization passes for MDX/Markdown sources.
//!
//! Each pass is a pure function `&str -> String`. A [`Normalizer`] holds an
//! ordered list of named passes and folds the text through them, so the
//! ordering lives in one place and every pass can be tested alone.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;

use crate::CodeFence;

/// A single rewrite step.
pub type Pass = fn(&str) -> String;

/// A pass with a name for logging.
#[derive(Debug, Clone, Copy)]
pub struct NamedPass {
    pub name: &'static str,
    pub apply: Pass,
}

impl NamedPass {
    pub const fn new(name: &'static str, apply: Pass) -> Self {
        Self { name, apply }
    }
}

/// Ordered list of normalization passes.
#[derive(Debug, Clone)]
pub struct Normalizer {
    passes: Vec<NamedPass>,
}

impl Normalizer {
    /// Build a normalizer from an explicit pass list.
    pub fn new(passes: Vec<NamedPass>) -> Self {
        Self { passes }
    }

    /// Pass list for general documentation (MDX with framework components).
    ///
    /// Images go before cards so a card's leftover tags are all that remain
    /// for the card scan; blank lines are collapsed last.
    pub fn docs() -> Self {
        Self::new(vec![
            NamedPass::new("remove_imports", remove_imports),
            NamedPass::new("flatten_tabs", flatten_tabs),
            NamedPass::new("remove_images", remove_images),
            NamedPass::new("replace_cards", replace_cards),
            NamedPass::new("strip_artifacts", strip_artifacts),
            NamedPass::new("collapse_blank_lines", collapse_blank_lines),
        ])
    }

    /// Pass list for the API reference: plain Markdown with HTML headings.
    pub fn api() -> Self {
        Self::new(vec![
            NamedPass::new("html_headings_to_markdown", html_headings_to_markdown),
            NamedPass::new("collapse_blank_lines", collapse_blank_lines),
        ])
    }

    /// Names of the passes, in application order.
    pub fn pass_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.passes.iter().map(|p| p.name)
    }

    /// Apply every pass in order and trim the result.
    pub fn run(&self, text: &str) -> String {
        let normalized = self.passes.iter().fold(text.to_string(), |acc, pass| {
            let next = (pass.apply)(&acc);
            trace!(
                pass = pass.name,
                before = acc.len(),
                after = next.len(),
                "normalizer pass"
            );
            next
        });
        normalized.trim().to_string()
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse `name="v"`, `name='v'` and `name={"v"}` attributes out of a tag.
/// The first occurrence of a name wins.
fn parse_attributes(tag: &str) -> HashMap<&str, &str> {
    static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r#"([A-Za-z_][\w-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|\{\s*"([^"]*)"\s*\}|\{\s*'([^']*)'\s*\})"#,
        )
        .expect("valid regex")
    });

    let mut attrs = HashMap::new();
    for caps in ATTR_RE.captures_iter(tag) {
        let (Some(name), Some(value)) = (
            caps.get(1),
            (2..=5).find_map(|i| caps.get(i)),
        ) else {
            continue;
        };
        attrs.entry(name.as_str()).or_insert(value.as_str());
    }
    attrs
}

/// Apply `rewrite` to the text between fenced code blocks. Fence lines and
/// code are copied unchanged; an unclosed fence runs to the end.
fn outside_fences(text: &str, rewrite: impl Fn(&str) -> String) -> String {
    let mut fence = CodeFence::default();
    let mut out = String::with_capacity(text.len());
    let mut prose_start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if fence.advance(line) {
            if prose_start < offset {
                out.push_str(&rewrite(&text[prose_start..offset]));
            }
            out.push_str(line);
            prose_start = offset + line.len();
        }
        offset += line.len();
    }

    if prose_start < text.len() {
        out.push_str(&rewrite(&text[prose_start..]));
    }
    out
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Pass 1: Remove MDX import statements
// ---------------------------------------------------------------------------

/// Drop `import ...` lines outside fenced code blocks.
pub fn remove_imports(text: &str) -> String {
    let mut fence = CodeFence::default();
    text.split('\n')
        .filter(|line| fence.advance(line) || !line.trim_start().starts_with("import "))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Flatten <Tabs>/<TabItem> groups
// ---------------------------------------------------------------------------

const TABS_CLOSE: &str = "</Tabs>";

static TABS_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<Tabs[\s>]").expect("valid regex"));

/// Replace each tab group with one `### Label` section per tab item.
///
/// The innermost group (last opener before the first closer) is flattened
/// first, so nested groups unwind from the inside out. A group without a
/// closing tag stops the scan and is left as-is.
pub fn flatten_tabs(text: &str) -> String {
    let mut out = text.to_string();

    loop {
        let Some(first_open) = TABS_OPEN_RE.find(&out).map(|m| m.start()) else {
            break;
        };
        let Some(close) = out[first_open..].find(TABS_CLOSE).map(|i| first_open + i) else {
            break;
        };
        let open = TABS_OPEN_RE
            .find_iter(&out[first_open..close])
            .last()
            .map_or(first_open, |m| first_open + m.start());
        let end = close + TABS_CLOSE.len();

        let replacement = render_tab_group(&out[open..end]);
        out.replace_range(open..end, &replacement);
    }

    out
}

fn render_tab_group(block: &str) -> String {
    static TAB_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)<TabItem\b([^>]*)>(.*?)</TabItem>").expect("valid regex")
    });

    let labels = extract_tab_labels(block);

    TAB_ITEM_RE
        .captures_iter(block)
        .map(|caps| {
            let attrs = parse_attributes(&caps[1]);
            let inner = caps[2].trim();
            let label = attrs
                .get("value")
                .and_then(|value| labels.get(*value).cloned())
                .or_else(|| attrs.get("label").map(|l| l.to_string()))
                .or_else(|| attrs.get("value").copied().map(capitalize));
            match label {
                Some(label) => format!("\n### {label}\n{inner}\n"),
                None => format!("\n{inner}\n"),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Map tab values to labels from `values={[{ label: '..', value: '..' }, ...]}`.
fn extract_tab_labels(block: &str) -> HashMap<String, String> {
    static VALUES_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)values=\{\[(.*?)\]\}").expect("valid regex"));
    static OBJECT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").expect("valid regex"));
    static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(\w+)\s*:\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
    });

    let mut labels = HashMap::new();
    let Some(values) = VALUES_RE.captures(block) else {
        return labels;
    };

    for object in OBJECT_RE.captures_iter(&values[1]) {
        let mut label = None;
        let mut value = None;
        for field in FIELD_RE.captures_iter(&object[1]) {
            let text = field.get(2).or_else(|| field.get(3)).map(|m| m.as_str());
            match &field[1] {
                "label" => label = text,
                "value" => value = text,
                _ => {}
            }
        }
        if let (Some(label), Some(value)) = (label, value) {
            labels.insert(value.to_string(), label.to_string());
        }
    }

    labels
}

// ---------------------------------------------------------------------------
// Pass 3: Remove images
// ---------------------------------------------------------------------------

/// Remove SVG/image components and Markdown images without a placeholder.
pub fn remove_images(text: &str) -> String {
    static SVG_SELF_CLOSING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<\w+Svg\b[^>]*/>").expect("valid regex"));
    static SVG_PAIRED_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)<\w+Svg\b[^>]*>.*?</\w+Svg\s*>").expect("valid regex")
    });
    static SVG_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"</?\w+Svg\b[^>]*>").expect("valid regex"));
    static IMAGE_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"</?(?:Image|img)\b[^>]*>").expect("valid regex"));
    static MD_IMAGE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid regex"));

    // Self-closing first, or the paired pattern would run to a later closer.
    let out = SVG_SELF_CLOSING_RE.replace_all(text, "");
    let out = SVG_PAIRED_RE.replace_all(&out, "");
    let out = SVG_TAG_RE.replace_all(&out, "");
    let out = IMAGE_TAG_RE.replace_all(&out, "");
    MD_IMAGE_RE.replace_all(&out, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4: Replace <Card> components
// ---------------------------------------------------------------------------

/// Turn `<Card title=".." description=".." />` into an H4 plus a description line.
pub fn replace_cards(text: &str) -> String {
    // Quoted and `{...}` attribute values are matched whole so a `>` inside
    // them (`icon={<Icon />}`) does not end the tag.
    static CARD_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"<Card\b(?:[^>"'{]|"[^"]*"|'[^']*'|\{(?:[^{}]|\{[^{}]*\})*\})*>"#)
            .expect("valid regex")
    });
    static CARD_CLOSE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"</Card\s*>").expect("valid regex"));

    let out = CARD_RE.replace_all(text, |caps: &Captures| {
        let attrs = parse_attributes(&caps[0]);
        let mut lines = Vec::with_capacity(2);
        if let Some(title) = attrs.get("title") {
            lines.push(format!("#### {title}"));
        }
        if let Some(description) = attrs.get("description") {
            lines.push((*description).to_string());
        }
        lines.join("\n")
    });

    CARD_CLOSE_RE.replace_all(&out, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 5: Strip highlight comments, callouts, and wrapper tags
// ---------------------------------------------------------------------------

/// Remove code highlight markers, inline admonitions as bold labels, and
/// drop `section`/`article`/`div` tags while keeping their contents.
///
/// Highlight markers only occur inside code blocks and are removed there;
/// admonitions and wrapper tags are rewritten outside fenced code only.
pub fn strip_artifacts(text: &str) -> String {
    static HIGHLIGHT_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]*//[ \t]*highlight-(?:start|end|next-line)[ \t]*(?:\n|$)")
            .expect("valid regex")
    });
    static HIGHLIGHT_INLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[ \t]*//[ \t]*highlight-(?:start|end|next-line)").expect("valid regex")
    });
    static ADMONITION_OPEN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r":::([A-Za-z]+)[ \t]*\n?").expect("valid regex"));
    static ADMONITION_CLOSE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r":::[ \t]*\n?").expect("valid regex"));
    static WRAPPER_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:section|article|div)\b[^>]*>").expect("valid regex")
    });

    let out = HIGHLIGHT_LINE_RE.replace_all(text, "");
    let out = HIGHLIGHT_INLINE_RE.replace_all(&out, "");

    outside_fences(&out, |prose| {
        let prose = ADMONITION_OPEN_RE.replace_all(prose, |caps: &Captures| {
            format!("\n**{}:** ", capitalize(&caps[1]))
        });
        let prose = ADMONITION_CLOSE_RE.replace_all(&prose, "\n");
        WRAPPER_TAG_RE.replace_all(&prose, "").into_owned()
    })
}

// ---------------------------------------------------------------------------
// Pass 6: HTML headings to Markdown
// ---------------------------------------------------------------------------

/// Convert `<h1>`..`<h4>` elements into `#`..`####` headings.
pub fn html_headings_to_markdown(text: &str) -> String {
    static HEADING_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
        (1..=4)
            .map(|n| {
                Regex::new(&format!(r"(?is)<h{n}\b[^>]*>(.*?)</h{n}\s*>")).expect("valid regex")
            })
            .collect()
    });

    HEADING_RES
        .iter()
        .enumerate()
        .fold(text.to_string(), |acc, (i, re)| {
            let hashes = "#".repeat(i + 1);
            re.replace_all(&acc, |caps: &Captures| {
                let inner = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
                format!("{hashes} {inner}")
            })
            .into_owned()
        })
}

// ---------------------------------------------------------------------------
// Pass 7: Collapse blank lines
// ---------------------------------------------------------------------------

/// Collapse three or more consecutive newlines (whitespace-only lines
/// included) into a single blank line.
pub fn collapse_blank_lines(text: &str) -> String {
    static BLANK_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid regex"));

    BLANK_RUN_RE.replace_all(text, "\n\n").into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_imports_drops_import_lines() {
        let input = "import Tabs from '@theme/Tabs';\n  import TabItem from '@theme/TabItem';\n\n# Title\nimportant text";
        assert_eq!(remove_imports(input), "\n# Title\nimportant text");
    }

    #[test]
    fn remove_imports_keeps_code_blocks() {
        let input = "import X from 'x';\n```python\nimport os\n```";
        assert_eq!(remove_imports(input), "```python\nimport os\n```");
    }

    #[test]
    fn flatten_tabs_uses_declared_labels() {
        let input = r#"Intro
<Tabs
  defaultValue="a"
  values={[
    { label: 'Alpha', value: 'a' },
    { value: "b", label: "Beta" },
  ]}>
<TabItem value="a">

Content A

</TabItem>
<TabItem value="b">
Content B
</TabItem>
</Tabs>
Outro"#;

        let result = flatten_tabs(input);
        assert_eq!(
            result,
            "Intro\n\n### Alpha\nContent A\n\n\n### Beta\nContent B\n\nOutro"
        );
        let alpha = result.find("### Alpha").unwrap();
        let beta = result.find("### Beta").unwrap();
        assert!(alpha < beta);
    }

    #[test]
    fn flatten_tabs_falls_back_to_item_label_then_value() {
        let input = "<Tabs>\n<TabItem value=\"npm\" label=\"NPM\">npm i</TabItem>\n<TabItem value=\"yarnPkg\">yarn add</TabItem>\n</Tabs>";
        let result = flatten_tabs(input);
        assert!(result.contains("### NPM\nnpm i"));
        assert!(result.contains("### Yarnpkg\nyarn add"));
        assert!(!result.contains("<Tab"));
    }

    #[test]
    fn flatten_tabs_handles_sequential_groups() {
        let input = "<Tabs>\n<TabItem value=\"py\">one</TabItem>\n</Tabs>\nmiddle\n<Tabs>\n<TabItem value=\"js\">two</TabItem>\n</Tabs>";
        let result = flatten_tabs(input);
        assert_eq!(result, "\n### Py\none\n\nmiddle\n\n### Js\ntwo\n");
    }

    #[test]
    fn flatten_tabs_unwinds_nested_groups() {
        let input = "<Tabs>\n<TabItem value=\"outer\">\n<Tabs>\n<TabItem value=\"inner\">deep</TabItem>\n</Tabs>\n</TabItem>\n</Tabs>";
        let result = flatten_tabs(input);
        assert!(!result.contains("<Tabs"));
        assert!(!result.contains("</TabItem>"));
        let outer = result.find("### Outer").unwrap();
        let inner = result.find("### Inner\ndeep").unwrap();
        assert!(outer < inner);
    }

    #[test]
    fn flatten_tabs_leaves_unclosed_group() {
        let input = "<Tabs>\n<TabItem value=\"a\">x</TabItem>";
        assert_eq!(flatten_tabs(input), input);
    }

    #[test]
    fn remove_images_strips_components_and_markdown() {
        let input = "A<LogoSvg width=\"20\" />B<ThemedSvg sources={x}>\n<DarkSvg/>\n</ThemedSvg>C<Image src=\"a.png\"/>D<img src=\"b.png\">E ![diagram](./arch.png) F";
        assert_eq!(remove_images(input), "ABCDE  F");
    }

    #[test]
    fn remove_images_keeps_links() {
        let input = "See [the docs](https://example.com).";
        assert_eq!(remove_images(input), input);
    }

    #[test]
    fn replace_cards_builds_heading_and_description() {
        let input = "<Card title=\"Quickstart\" description='Get going fast' href=\"/start\" />";
        assert_eq!(replace_cards(input), "#### Quickstart\nGet going fast");
    }

    #[test]
    fn replace_cards_handles_missing_attributes() {
        assert_eq!(replace_cards("<Card title=\"Only Title\"/>"), "#### Only Title");
        assert_eq!(replace_cards("<Card description=\"Only desc\"/>"), "Only desc");
        assert_eq!(replace_cards("x<Card href=\"/a\" />y"), "xy");
    }

    #[test]
    fn replace_cards_removes_closing_tags_but_not_other_components() {
        let input = "<CardGrid>\n<Card title=\"T\">\n</Card>\n</CardGrid>";
        assert_eq!(replace_cards(input), "<CardGrid>\n#### T\n\n</CardGrid>");
    }

    #[test]
    fn replace_cards_skips_over_jsx_attribute_values() {
        let input = "<Card title=\"T\" icon={<Icon />} description=\"D\" />";
        assert_eq!(replace_cards(input), "#### T\nD");

        let nested = "<Card style={{ color: 'red' }} title='Styled'>\n</Card>";
        assert_eq!(replace_cards(nested), "#### Styled\n");
    }

    #[test]
    fn strip_artifacts_leaves_fenced_examples_alone() {
        let input = "Use a callout:\n```md\n:::tip\nHello\n:::\n<div>raw</div>\n```\n:::note\nReal\n:::";
        let result = strip_artifacts(input);

        assert!(result.contains("```md\n:::tip\nHello\n:::\n<div>raw</div>\n```\n"));
        assert!(result.contains("**Note:** Real"));
        assert!(result.starts_with("Use a callout:\n```md"));
    }

    #[test]
    fn strip_artifacts_treats_unclosed_fence_as_code() {
        let input = "<div>x</div>\n~~~\n:::tip\n";
        assert_eq!(strip_artifacts(input), "x\n~~~\n:::tip\n");
    }

    #[test]
    fn strip_artifacts_removes_highlight_markers() {
        let input = "```js\n// highlight-start\nconst a = 1;\n// highlight-end\nfoo(); // highlight-next-line\n```";
        assert_eq!(strip_artifacts(input), "```js\nconst a = 1;\nfoo();\n```");
    }

    #[test]
    fn strip_artifacts_inlines_callouts() {
        let input = ":::tip\nUse the cache.\n:::\n\n:::warning\nCareful.\n:::";
        let result = strip_artifacts(input);
        assert_eq!(result, "\n**Tip:** Use the cache.\n\n\n\n**Warning:** Careful.\n\n");
    }

    #[test]
    fn strip_artifacts_labels_note_and_info() {
        let result = strip_artifacts(":::note\nA\n:::\n:::info\nB\n:::");
        assert!(result.contains("**Note:** A"));
        assert!(result.contains("**Info:** B"));
        assert!(!result.contains(":::"));
    }

    #[test]
    fn strip_artifacts_unwraps_html_containers() {
        let input = "<section class=\"x\"><div>Keep me</div></section><article>\nAnd me\n</article>";
        assert_eq!(strip_artifacts(input), "Keep me\nAnd me\n");
    }

    #[test]
    fn html_headings_convert_all_levels() {
        let input = "<h1>Top</h1>\n<H2 id=\"a\">  Second\n  Line </H2>\n<h3>Third</h3>\n<h4 class=\"x\">Fourth</h4>\n<h5>Fifth</h5>";
        assert_eq!(
            html_headings_to_markdown(input),
            "# Top\n## Second Line\n### Third\n#### Fourth\n<h5>Fifth</h5>"
        );
    }

    #[test]
    fn collapse_blank_lines_to_single_blank() {
        assert_eq!(collapse_blank_lines("# A\n\n\n\n\n\n# B"), "# A\n\n# B");
        assert_eq!(collapse_blank_lines("a\n \n\t\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn capitalize_matches_title_case_of_first_letter() {
        assert_eq!(capitalize("python"), "Python");
        assert_eq!(capitalize("cURL"), "Curl");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn docs_normalizer_runs_in_order() {
        let normalizer = Normalizer::docs();
        let names: Vec<_> = normalizer.pass_names().collect();
        assert_eq!(
            names,
            [
                "remove_imports",
                "flatten_tabs",
                "remove_images",
                "replace_cards",
                "strip_artifacts",
                "collapse_blank_lines"
            ]
        );
    }

    #[test]
    fn docs_normalizer_full_document() {
        let input = r#"import Tabs from '@theme/Tabs';
import TabItem from '@theme/TabItem';

# Connectors

![banner](./banner.png)

<div className="cards">
<Card title="Postgres" description="Sync tables" />
</div>



:::note
Connectors sync hourly.
:::

<Tabs values={[{ label: 'Python', value: 'py' }]}>
<TabItem value="py">

```python
import shaped
```

</TabItem>
</Tabs>
"#;
        let result = Normalizer::docs().run(input);

        assert!(result.starts_with("# Connectors"));
        assert!(result.contains("#### Postgres\nSync tables"));
        assert!(result.contains("**Note:** Connectors sync hourly."));
        assert!(result.contains("### Python\n```python\nimport shaped\n```"));
        assert!(!result.contains("banner"));
        assert!(!result.contains("<div"));
        assert!(!result.contains("\n\n\n"));
    }

    #[test]
    fn api_normalizer_is_noop_on_plain_markdown() {
        let input = "# API\n\nText";
        assert_eq!(Normalizer::api().run(input), input);
    }
}
