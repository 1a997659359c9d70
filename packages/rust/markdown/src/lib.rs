//! Markdown collaborator: comrak rendering plus spec shorthand.
//!
//! Renders markdown to HTML via `comrak`, layering three inline shorthand
//! syntaxes over the stock grammar (see [`extensions`]) and normalizing
//! headings for spec documents: level-1 headings are demoted to level 2
//! and headings receive stable slug ids.

mod extensions;

use std::collections::HashSet;
use std::sync::LazyLock;

use comrak::{Options, markdown_to_html};
use regex::Regex;
use tracing::debug;

use specmill_shared::Citation;

pub use extensions::expand_shorthand;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Options for the markdown conversion.
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Enable GitHub-flavored tables/autolinks/strikethrough.
    pub gfm: bool,
    /// Render single newlines as hard breaks.
    pub breaks: bool,
    /// Smart punctuation (quotes, dashes, ellipses).
    pub smartypants: bool,
    /// Assign slug ids to headings.
    pub header_ids: bool,
    /// Demote level-1 headings to level 2 (the document header owns h1).
    pub demote_h1: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            gfm: true,
            breaks: true,
            smartypants: true,
            header_ids: true,
            demote_h1: true,
        }
    }
}

/// Result of rendering one markdown source.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// The produced HTML fragment.
    pub html: String,
    /// Citations seen while expanding `[[SPEC]]` markers, in source order.
    pub citations: Vec<Citation>,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Render markdown to HTML with the spec shorthand expansions applied.
pub fn render(source: &str, opts: &MarkdownOptions) -> Rendered {
    let source = if opts.demote_h1 {
        demote_h1(source)
    } else {
        source.to_string()
    };

    let (expanded, citations) = expand_shorthand(&source);

    let mut options = Options::default();
    if opts.gfm {
        options.extension.table = true;
        options.extension.autolink = true;
        options.extension.strikethrough = true;
    }
    options.parse.smart = opts.smartypants;
    options.render.hardbreaks = opts.breaks;
    // Required so the expanded shorthand anchors survive rendering.
    options.render.unsafe_ = true;

    let mut html = markdown_to_html(&expanded, &options);
    if opts.header_ids {
        html = assign_heading_ids(&html);
    }

    debug!(
        input_len = source.len(),
        output_len = html.len(),
        citations = citations.len(),
        "markdown rendered"
    );

    Rendered { html, citations }
}

// ---------------------------------------------------------------------------
// Heading normalization
// ---------------------------------------------------------------------------

/// Demote `# heading` lines to `## heading` outside fenced code blocks.
fn demote_h1(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut in_fence = false;
    for (i, line) in source.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            out.push_str(line);
            continue;
        }
        if !in_fence && line.starts_with("# ") {
            out.push('#');
            out.push_str(line);
        } else {
            out.push_str(line);
        }
    }
    if source.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Give every id-less `<h2>`–`<h6>` a slug id derived from its text,
/// deduplicated within the fragment.
fn assign_heading_ids(html: &str) -> String {
    static HEADING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<h([2-6])>(.*?)</h([2-6])>").expect("valid regex"));
    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

    let mut taken: HashSet<String> = HashSet::new();

    HEADING_RE
        .replace_all(html, |caps: &regex::Captures<'_>| {
            let level = &caps[1];
            let inner = &caps[2];
            if &caps[1] != &caps[3] {
                return caps[0].to_string();
            }
            let text = TAG_RE.replace_all(inner, "");
            let base = slugify(&text);
            if base.is_empty() {
                return caps[0].to_string();
            }
            let mut id = base.clone();
            let mut n = 2;
            while taken.contains(&id) {
                id = format!("{base}-{n}");
                n += 1;
            }
            taken.insert(id.clone());
            format!("<h{level} id=\"{id}\">{inner}</h{level}>")
        })
        .into_owned()
}

/// Slug form of heading text: lowercase, word characters and hyphens only.
fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for ch in text.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if (ch.is_whitespace() || ch == '-' || ch == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_basic_markdown() {
        let out = render("Some **bold** text.", &MarkdownOptions::default());
        assert!(out.html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn demotes_h1_and_assigns_heading_ids() {
        let out = render("# Title\n\n## Sub Section\n", &MarkdownOptions::default());
        assert!(out.html.contains("<h2 id=\"title\">Title</h2>"));
        assert!(out.html.contains("<h2 id=\"sub-section\">Sub Section</h2>"));
        assert!(!out.html.contains("<h1"));
    }

    #[test]
    fn duplicate_headings_get_suffixed_ids() {
        let out = render("## Notes\n\n## Notes\n", &MarkdownOptions::default());
        assert!(out.html.contains("id=\"notes\""));
        assert!(out.html.contains("id=\"notes-2\""));
    }

    #[test]
    fn shorthand_anchors_survive_rendering() {
        let out = render(
            "The [= event loop =] uses {{ Window.fetch }} per [[!HTML]].",
            &MarkdownOptions::default(),
        );
        assert!(out.html.contains("data-term=\"event loop\""));
        assert!(out.html.contains("data-idl=\"Window.fetch\""));
        assert!(out.html.contains("data-spec=\"HTML\""));
        assert_eq!(out.citations.len(), 1);
        assert!(out.citations[0].normative);
    }

    #[test]
    fn code_fence_content_is_not_expanded() {
        let out = render(
            "```idl\ninterface Foo {};\n```\n",
            &MarkdownOptions::default(),
        );
        assert!(out.html.contains("interface Foo"));
        assert!(!out.html.contains("data-idl"));
    }

    #[test]
    fn headings_demotion_skips_fences() {
        let out = render("```\n# not a heading\n```\n", &MarkdownOptions::default());
        assert!(out.html.contains("# not a heading"));
    }

    #[test]
    fn slugify_cases() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("  API — Reference  "), "api-reference");
        assert_eq!(slugify("a_b c"), "a-b-c");
    }
}
