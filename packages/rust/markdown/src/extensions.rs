//! Inline shorthand syntaxes layered over the stock markdown grammar.
//!
//! Three markers are expanded to annotation anchors before the markdown
//! engine runs:
//!
//! - `[= term =]`        → `<a data-term="term">term</a>`
//! - `{{ Name.member }}` → `<a data-idl="Name.member">Name.member</a>`
//! - `[[SPEC]]` / `[[!SPEC]]` → `<a data-spec="SPEC" data-normative="…">[SPEC]</a>`
//!
//! Fenced code blocks and inline code spans are left untouched. Citations
//! are additionally collected into a side-channel list so callers can see
//! them before any document tree exists.

use specmill_shared::Citation;

/// Expand shorthand markers in markdown source, returning the rewritten
/// source and the citations encountered.
pub fn expand_shorthand(source: &str) -> (String, Vec<Citation>) {
    let mut out = String::with_capacity(source.len());
    let mut citations = Vec::new();
    let mut fence: Option<&'static str> = None;

    for (i, line) in source.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let trimmed = line.trim_start();
        if let Some(marker) = fence {
            out.push_str(line);
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            out.push_str(line);
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            out.push_str(line);
            continue;
        }
        expand_line(line, &mut out, &mut citations);
    }
    if source.ends_with('\n') {
        out.push('\n');
    }
    (out, citations)
}

fn expand_line(line: &str, out: &mut String, citations: &mut Vec<Citation>) {
    let bytes = line.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        // Inline code spans pass through verbatim, matching backtick runs.
        if bytes[i] == b'`' {
            let run_start = i;
            while i < bytes.len() && bytes[i] == b'`' {
                i += 1;
            }
            let ticks = &line[run_start..i];
            if let Some(close) = line[i..].find(ticks) {
                let end = i + close + ticks.len();
                out.push_str(&line[run_start..end]);
                i = end;
            } else {
                out.push_str(ticks);
            }
            continue;
        }

        if let Some(next) = try_marker(&line[i..], out, citations) {
            i += next;
            continue;
        }

        let ch = line[i..].chars().next().expect("in-bounds char");
        out.push(ch);
        i += ch.len_utf8();
    }
}

/// Try to expand a marker at the start of `rest`; returns the number of
/// source bytes consumed on success.
fn try_marker(rest: &str, out: &mut String, citations: &mut Vec<Citation>) -> Option<usize> {
    if let Some(inner) = delimited(rest, "[=", "=]") {
        let term = inner.trim();
        out.push_str(&format!(
            "<a data-term=\"{}\">{}</a>",
            escape_attr(term),
            escape_text(term)
        ));
        return Some(inner.len() + 4);
    }
    if let Some(inner) = delimited(rest, "{{", "}}") {
        let name = inner.trim();
        out.push_str(&format!(
            "<a data-idl=\"{}\">{}</a>",
            escape_attr(name),
            escape_text(name)
        ));
        return Some(inner.len() + 4);
    }
    if let Some(inner) = delimited(rest, "[[", "]]") {
        let raw = inner.trim();
        let normative = raw.starts_with('!');
        let id = if normative { &raw[1..] } else { raw };
        citations.push(Citation {
            id: id.to_string(),
            normative,
        });
        out.push_str(&format!(
            "<a data-spec=\"{}\" data-normative=\"{normative}\">[{}]</a>",
            escape_attr(id),
            escape_text(id)
        ));
        return Some(inner.len() + 4);
    }
    None
}

/// The text between `open` and `close` when `rest` starts with `open` and
/// a closing marker follows on the same line.
fn delimited<'a>(rest: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let body = rest.strip_prefix(open)?;
    let end = body.find(close)?;
    Some(&body[..end])
}

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concept_reference_expands() {
        let (out, cites) = expand_shorthand("The [= event loop =] spins.");
        assert_eq!(
            out,
            "The <a data-term=\"event loop\">event loop</a> spins."
        );
        assert!(cites.is_empty());
    }

    #[test]
    fn idl_reference_expands_with_member() {
        let (out, _) = expand_shorthand("See {{ Window.fetch }} for details.");
        assert_eq!(
            out,
            "See <a data-idl=\"Window.fetch\">Window.fetch</a> for details."
        );
    }

    #[test]
    fn citations_collect_normative_flag() {
        let (out, cites) = expand_shorthand("Per [[!RFC2119]] and [[DOM]].");
        assert!(out.contains("<a data-spec=\"RFC2119\" data-normative=\"true\">[RFC2119]</a>"));
        assert!(out.contains("<a data-spec=\"DOM\" data-normative=\"false\">[DOM]</a>"));
        assert_eq!(
            cites,
            vec![
                Citation {
                    id: "RFC2119".into(),
                    normative: true
                },
                Citation {
                    id: "DOM".into(),
                    normative: false
                },
            ]
        );
    }

    #[test]
    fn fenced_code_is_untouched() {
        let src = "before [= a =]\n```\n[= not a term =]\n{{ NotIdl }}\n```\nafter [[X]]\n";
        let (out, cites) = expand_shorthand(src);
        assert!(out.contains("<a data-term=\"a\">a</a>"));
        assert!(out.contains("[= not a term =]"));
        assert!(out.contains("{{ NotIdl }}"));
        assert_eq!(cites.len(), 1);
        assert_eq!(cites[0].id, "X");
    }

    #[test]
    fn inline_code_is_untouched() {
        let (out, _) = expand_shorthand("use `{{ raw }}` but {{ Real }} links");
        assert!(out.contains("`{{ raw }}`"));
        assert!(out.contains("<a data-idl=\"Real\">Real</a>"));
    }

    #[test]
    fn unterminated_marker_passes_through() {
        let (out, cites) = expand_shorthand("broken [[RFC2119 marker");
        assert_eq!(out, "broken [[RFC2119 marker");
        assert!(cites.is_empty());
    }

    #[test]
    fn marker_content_is_escaped() {
        let (out, _) = expand_shorthand("[= a<b =]");
        assert!(out.contains("data-term=\"a&lt;b\""));
    }
}
