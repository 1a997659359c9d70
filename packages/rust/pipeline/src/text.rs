//! Small text utilities shared by the passes.

/// Normalize a term for index keys: lower-cased, whitespace-collapsed.
pub fn normalize_term(term: &str) -> String {
    term.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Slug form of a name: lowercase alphanumerics with hyphen separators.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for ch in text.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Collapse all whitespace runs to single spaces and trim.
pub fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace-collapsed text truncated to `max` characters with an
/// ellipsis marker when it overflows.
pub fn snippet(text: &str, max: usize) -> String {
    let collapsed = collapse_ws(text);
    if collapsed.chars().count() <= max {
        return collapsed;
    }
    let head: String = collapsed.chars().take(max.saturating_sub(3)).collect();
    format!("{head}...")
}

/// Strip the common leading indentation from every non-blank line.
pub fn strip_indent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_lowercases() {
        assert_eq!(normalize_term("  Event \t Loop "), "event loop");
    }

    #[test]
    fn slugify_strips_punctuation() {
        assert_eq!(slugify("Event Loop"), "event-loop");
        assert_eq!(slugify("  See: §2.1  "), "see-2-1");
        assert_eq!(slugify("already-slugged"), "already-slugged");
    }

    #[test]
    fn snippet_truncates_with_ellipsis() {
        let long = "word ".repeat(100);
        let s = snippet(&long, 200);
        assert_eq!(s.chars().count(), 200);
        assert!(s.ends_with("..."));

        assert_eq!(snippet("short  text", 200), "short text");
    }

    #[test]
    fn strip_indent_removes_common_prefix() {
        let text = "    line one\n      line two\n    line three";
        assert_eq!(strip_indent(text), "line one\n  line two\nline three");
    }
}
