//! Structured-interface indexing and shorthand reference resolution.
//!
//! Scans candidate code blocks for interface-definition grammar, emits a
//! hidden anchor per declared name (and per linkable member), and resolves
//! `a[data-idl]` references against the accumulated index. The index spans
//! every block in the document, so interface fragments split across blocks
//! still cross-link; the first registration of a key wins.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use specmill_dom::{Document, NodeId};
use specmill_shared::{OutputArea, Result};

use crate::context::{AreaOutput, IdlOutput, IdlTarget, Pass, PassFlow, PipelineContext};
use crate::idl::{self, DeclKind};
use crate::text::{normalize_term, slugify, snippet};

pub struct IdlPass;

#[async_trait]
impl Pass for IdlPass {
    fn area(&self) -> OutputArea {
        OutputArea::Idl
    }

    async fn run(&self, doc: &mut Document, ctx: &mut PipelineContext) -> Result<PassFlow> {
        let suppress_class = ctx.options.diagnostics.suppress_class.clone();

        let mut index: HashMap<String, String> = HashMap::new();
        let mut all_targets = Vec::new();

        for (block, source) in find_idl_blocks(doc) {
            match idl::parse(&source) {
                Ok(declarations) => {
                    let targets = collect_targets(&declarations);
                    insert_anchors(doc, block, &targets, &mut index);
                    all_targets.extend(targets);
                }
                Err(e) => {
                    ctx.warn(format!(
                        "IDL parse error in \"{}\": {e}",
                        snippet(&source, 40)
                    ));
                }
            }
        }

        debug!(targets = all_targets.len(), "interface index built");

        resolve_idl_links(doc, &index, &suppress_class, &mut ctx.warnings);

        ctx.outputs.insert(
            OutputArea::Idl,
            AreaOutput::Idl(IdlOutput {
                targets: all_targets,
            }),
        );
        Ok(PassFlow::Continue)
    }
}

/// Candidate `pre` blocks: an `idl`/`language-idl` class, or content that
/// leads with a definition keyword.
fn find_idl_blocks(doc: &Document) -> Vec<(NodeId, String)> {
    static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\s*(?:partial\s+)?(?:interface|dictionary|enum|namespace|callback|typedef)\b")
            .expect("valid regex")
    });

    let mut blocks = Vec::new();
    for pre in doc.elements_with_tag(&["pre"]) {
        let code = doc
            .children(pre)
            .iter()
            .copied()
            .find(|&c| doc.tag(c) == Some("code"));

        // The language class may sit on the pre or on its code child
        // (fenced markdown puts it on the code element).
        let class_marked = std::iter::once(pre)
            .chain(code)
            .any(|el| has_idl_class(doc, el));

        let text = match code {
            Some(code) => doc.text_content(code),
            None => doc.text_content(pre),
        };

        if text.trim().is_empty() {
            continue;
        }
        if class_marked || KEYWORD_RE.is_match(&text) {
            blocks.push((pre, text));
        }
    }
    blocks
}

fn has_idl_class(doc: &Document, element: NodeId) -> bool {
    doc.attr(element, "class")
        .unwrap_or_default()
        .to_lowercase()
        .split_ascii_whitespace()
        .any(|c| c == "idl" || c == "language-idl")
}

/// Targets for one block's declarations: a top-level entry per named
/// declaration plus `interface.member` entries for linkable members.
/// Partial declarations extend an index built elsewhere and are skipped.
fn collect_targets(declarations: &[idl::Declaration]) -> Vec<IdlTarget> {
    let mut targets = Vec::new();
    for decl in declarations {
        if decl.partial {
            continue;
        }
        targets.push(IdlTarget {
            id: format!("idl-{}", slugify(&decl.name)),
            key: normalize_term(&decl.name),
            text: decl.name.clone(),
        });
        if matches!(
            decl.kind,
            DeclKind::Interface
                | DeclKind::InterfaceMixin
                | DeclKind::CallbackInterface
                | DeclKind::Namespace
                | DeclKind::Dictionary
        ) {
            for member in &decl.members {
                targets.push(IdlTarget {
                    id: format!("idl-{}-{}", slugify(&decl.name), slugify(&member.name)),
                    key: format!(
                        "{}.{}",
                        normalize_term(&decl.name),
                        normalize_term(&member.name)
                    ),
                    text: format!("{}.{}", decl.name, member.name),
                });
            }
        }
    }
    targets
}

/// Insert a hidden anchor wrapper before the source block and register the
/// actually-assigned (document-unique) ids in the index.
fn insert_anchors(
    doc: &mut Document,
    block: NodeId,
    targets: &[IdlTarget],
    index: &mut HashMap<String, String>,
) {
    if targets.is_empty() {
        return;
    }
    let wrapper = doc.create_element("div");
    doc.set_attr(wrapper, "class", "idl-anchors");
    doc.set_attr(wrapper, "hidden", "");
    doc.insert_before(block, wrapper);

    for target in targets {
        let assigned = doc.unique_id(&target.id);
        let anchor = doc.create_element("a");
        doc.set_attr(anchor, "id", &assigned);
        let text = doc.create_text(&target.text);
        doc.append_child(anchor, text);
        doc.append_child(wrapper, anchor);

        index
            .entry(target.key.clone())
            .or_insert_with(|| format!("#{assigned}"));
    }
}

/// Resolve `a[data-idl]` shorthand anchors by case-insensitive key match.
fn resolve_idl_links(
    doc: &mut Document,
    index: &HashMap<String, String>,
    suppress_class: &str,
    warnings: &mut Vec<String>,
) {
    let anchors: Vec<NodeId> = doc
        .elements_with_tag(&["a"])
        .into_iter()
        .filter(|&a| doc.attr(a, "data-idl").is_some())
        .collect();

    for anchor in anchors {
        if doc.in_class_scope(anchor, suppress_class) {
            continue;
        }
        let term = doc
            .attr(anchor, "data-idl")
            .unwrap_or_default()
            .trim()
            .to_string();

        let key = match term.split_once('.') {
            Some((interface, member)) => format!(
                "{}.{}",
                normalize_term(interface),
                normalize_term(member)
            ),
            None => normalize_term(&term),
        };

        match index.get(&key) {
            Some(href) => doc.set_attr(anchor, "href", href),
            None => warnings.push(format!("Unresolved IDL link: \"{term}\"")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use specmill_dom::{ScraperParser, TreeParser};
    use std::sync::Arc;

    async fn run_idl(html: &str) -> (Document, PipelineContext) {
        let mut doc = ScraperParser.parse(html);
        let mut ctx = PipelineContext::new(Arc::new(RunOptions::default()));
        IdlPass
            .run(&mut doc, &mut ctx)
            .await
            .expect("idl pass never errors");
        (doc, ctx)
    }

    fn href_of(doc: &Document, term: &str) -> Option<String> {
        doc.elements_with_tag(&["a"])
            .into_iter()
            .find(|&a| doc.attr(a, "data-idl") == Some(term))
            .and_then(|a| doc.attr(a, "href"))
            .map(String::from)
    }

    #[tokio::test]
    async fn indexes_block_and_inserts_hidden_anchors() {
        let (doc, ctx) = run_idl(
            "<pre class=\"idl\"><code>interface Window { attribute DOMString name; };</code></pre>",
        )
        .await;

        assert!(doc.element_by_id("idl-window").is_some());
        assert!(doc.element_by_id("idl-window-name").is_some());

        // Wrapper sits before the pre block and is hidden.
        let pre = doc.elements_with_tag(&["pre"])[0];
        let wrapper = doc.elements_with_tag(&["div"])[0];
        assert!(doc.has_class(wrapper, "idl-anchors"));
        assert_eq!(doc.attr(wrapper, "hidden"), Some(""));
        let parent = doc.parent(pre).expect("pre has parent");
        let kids = doc.children(parent);
        let wrapper_pos = kids.iter().position(|&k| k == wrapper).expect("wrapper");
        let pre_pos = kids.iter().position(|&k| k == pre).expect("pre");
        assert!(wrapper_pos < pre_pos);

        match &ctx.outputs[&OutputArea::Idl] {
            AreaOutput::Idl(out) => assert_eq!(out.targets.len(), 2),
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[tokio::test]
    async fn member_reference_resolves_case_insensitively() {
        let (doc, ctx) = run_idl(
            "<pre class=\"idl\">interface Window { Promise&lt;Response&gt; fetch(RequestInfo i); };</pre>\
             <p><a data-idl=\"window.FETCH\">Window.fetch</a></p>",
        )
        .await;
        assert_eq!(
            href_of(&doc, "window.FETCH").as_deref(),
            Some("#idl-window-fetch")
        );
        assert!(ctx.warnings.is_empty());
    }

    #[tokio::test]
    async fn index_spans_multiple_blocks() {
        let (doc, _) = run_idl(
            "<pre>interface A {};</pre><pre>interface B { attribute long x; };</pre>\
             <p><a data-idl=\"B.x\">B.x</a> <a data-idl=\"A\">A</a></p>",
        )
        .await;
        assert_eq!(href_of(&doc, "B.x").as_deref(), Some("#idl-b-x"));
        assert_eq!(href_of(&doc, "A").as_deref(), Some("#idl-a"));
    }

    #[tokio::test]
    async fn unknown_reference_warns() {
        let (_, ctx) = run_idl(
            "<pre>interface A {};</pre><p><a data-idl=\"A.missing\">A.missing</a></p>",
        )
        .await;
        assert_eq!(ctx.warnings, vec!["Unresolved IDL link: \"A.missing\""]);
    }

    #[tokio::test]
    async fn malformed_block_warns_but_others_index() {
        let (doc, ctx) = run_idl(
            "<pre class=\"idl\">interface Broken {</pre><pre>interface Fine {};</pre>",
        )
        .await;
        assert_eq!(ctx.warnings.len(), 1);
        assert!(ctx.warnings[0].starts_with("IDL parse error"));
        assert!(doc.element_by_id("idl-fine").is_some());
    }

    #[tokio::test]
    async fn colliding_anchor_ids_are_disambiguated() {
        let (doc, _) = run_idl(
            "<div id=\"idl-window\"></div><pre>interface Window {};</pre>\
             <p><a data-idl=\"Window\">Window</a></p>",
        )
        .await;
        // The pre-existing id forces a suffixed anchor, and the index
        // points at the anchor actually assigned.
        assert_eq!(href_of(&doc, "Window").as_deref(), Some("#idl-window-2"));
    }

    #[tokio::test]
    async fn non_idl_pre_blocks_are_ignored() {
        let (doc, ctx) = run_idl("<pre><code>fn main() {}\n</code></pre>").await;
        assert!(ctx.warnings.is_empty());
        match &ctx.outputs[&OutputArea::Idl] {
            AreaOutput::Idl(out) => assert!(out.targets.is_empty()),
            other => panic!("unexpected output {other:?}"),
        }
        assert_eq!(doc.elements_with_tag(&["div"]).len(), 0);
    }
}
