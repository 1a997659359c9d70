//! Cross-reference resolution: concept references → concrete anchors.
//!
//! Two tiers. The local tier matches references against the in-document
//! terminology map and resolves synchronously. Remaining references are
//! grouped by (normalized term, spec-scope override) and sent to each
//! registered external resolver as one batch; candidate hits are then
//! disambiguated by the preferred spec list. All anchors in one group
//! receive the same resolution, so identical terms in identical scopes
//! resolve identically within a run.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use specmill_dom::{Document, NodeId};
use specmill_shared::{OutputArea, Result, XrefQuery, XrefResult};

use crate::context::{Pass, PassFlow, PipelineContext};
use crate::local_map::build_local_map;
use crate::resolver::XrefSource;
use crate::text::normalize_term;

pub struct XrefPass;

/// One concept-reference anchor with its resolved scope context.
struct AnchorRef {
    node: NodeId,
    term: String,
    /// Spec shortnames from the nearest `data-cite` ancestor.
    scope: Option<Vec<String>>,
}

/// References sharing a (term, scope) bucket, resolved together.
struct UnresolvedGroup {
    term: String,
    anchors: Vec<NodeId>,
    scope: Option<Vec<String>>,
    results: Vec<XrefResult>,
}

#[async_trait]
impl Pass for XrefPass {
    fn area(&self) -> OutputArea {
        OutputArea::Xref
    }

    async fn run(&self, doc: &mut Document, ctx: &mut PipelineContext) -> Result<PassFlow> {
        let suppress_class = ctx.options.diagnostics.suppress_class.clone();
        let anchors = collect_anchors(doc, &suppress_class);
        if anchors.is_empty() {
            return Ok(PassFlow::Continue);
        }

        // Local tier.
        let local = build_local_map(doc);
        let mut groups: Vec<UnresolvedGroup> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();

        for anchor in anchors {
            let key = normalize_term(&anchor.term);
            if let Some(target) = local.get(&key) {
                doc.set_attr(anchor.node, "href", &target.href);
                continue;
            }

            let scope_key = anchor
                .scope
                .as_ref()
                .map(|s| s.join(","))
                .unwrap_or_default();
            let bucket = format!("{key}|{scope_key}");
            match group_index.get(&bucket) {
                Some(&i) => groups[i].anchors.push(anchor.node),
                None => {
                    group_index.insert(bucket, groups.len());
                    groups.push(UnresolvedGroup {
                        term: anchor.term,
                        anchors: vec![anchor.node],
                        scope: anchor.scope,
                        results: Vec::new(),
                    });
                }
            }
        }

        debug!(unresolved = groups.len(), "querying external tier");

        // External tier: one batch per registered resolver, failures
        // isolated per resolver.
        let sources = ctx.options.xref.clone();
        for source in &sources {
            let (queries, targets) = build_queries(source, &groups);
            if queries.is_empty() {
                continue;
            }
            match source.resolver.resolve_batch(&queries).await {
                Ok(results) => {
                    for (id, hits) in results {
                        if let Some(&gi) = targets.get(&id) {
                            groups[gi].results.extend(hits);
                        }
                    }
                }
                Err(e) => ctx.warn(format!("Xref resolver failed: {e}")),
            }
        }

        // Disambiguate and rewrite, one decision per group. Without a
        // scope override the first resolver's spec list is the priority.
        let default_priority: Vec<String> = sources
            .first()
            .and_then(|s| s.specs.clone())
            .unwrap_or_default();

        for group in &groups {
            match disambiguate(&group.results, group.scope.as_deref(), &default_priority) {
                Resolution::Resolved(hit) => {
                    for &anchor in &group.anchors {
                        doc.set_attr(anchor, "href", &hit.href);
                        if let Some(cite) = &hit.cite {
                            doc.set_attr(anchor, "data-cite", cite);
                        }
                    }
                }
                Resolution::Ambiguous => {
                    ctx.warn(format!("Ambiguous xref: \"{}\"", group.term));
                }
                Resolution::Unresolved => {
                    ctx.warn(format!("No matching xref: \"{}\"", group.term));
                }
            }
        }

        Ok(PassFlow::Continue)
    }
}

/// Collect `a[data-term]` anchors in one pre-order traversal, carrying the
/// scope context (nearest `data-cite` spec list) and suppression state so
/// neither is re-derived per reference.
fn collect_anchors(doc: &Document, suppress_class: &str) -> Vec<AnchorRef> {
    let mut out = Vec::new();
    let mut scope_stack: Vec<Vec<String>> = Vec::new();
    walk(doc, doc.root(), &mut scope_stack, false, suppress_class, &mut out);
    out
}

fn walk(
    doc: &Document,
    node: NodeId,
    scope_stack: &mut Vec<Vec<String>>,
    suppressed: bool,
    suppress_class: &str,
    out: &mut Vec<AnchorRef>,
) {
    for &child in doc.children(node) {
        if !doc.is_element(child) {
            continue;
        }
        let mut pushed = false;
        if let Some(cite) = doc.attr(child, "data-cite") {
            let specs = split_specs(cite);
            if !specs.is_empty() {
                scope_stack.push(specs);
                pushed = true;
            }
        }
        let child_suppressed = suppressed || doc.has_class(child, suppress_class);

        if doc.tag(child) == Some("a") && !child_suppressed {
            if let Some(term) = doc.attr(child, "data-term") {
                out.push(AnchorRef {
                    node: child,
                    term: term.to_string(),
                    scope: scope_stack.last().cloned(),
                });
            }
        }

        walk(doc, child, scope_stack, child_suppressed, suppress_class, out);
        if pushed {
            scope_stack.pop();
        }
    }
}

fn split_specs(value: &str) -> Vec<String> {
    value
        .split([' ', ',', '\t', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Build the query batch for one resolver, restricting each group to the
/// resolver's allowed spec list intersected with any scope override.
/// Returns the queries and a query-id → group-index map.
fn build_queries(
    source: &XrefSource,
    groups: &[UnresolvedGroup],
) -> (Vec<XrefQuery>, HashMap<String, usize>) {
    let mut queries = Vec::new();
    let mut targets = HashMap::new();

    for (gi, group) in groups.iter().enumerate() {
        let specs: Option<Vec<String>> = match (&group.scope, &source.specs) {
            (Some(scope), Some(allowed)) => Some(
                scope
                    .iter()
                    .filter(|s| allowed.contains(*s))
                    .cloned()
                    .collect(),
            ),
            (Some(scope), None) => Some(scope.clone()),
            (None, allowed) => allowed.clone(),
        };
        // A scope override disjoint from the resolver's spec list means
        // this resolver cannot answer for the group at all.
        if matches!(&specs, Some(list) if list.is_empty()) {
            continue;
        }

        let id = format!("{gi}|{}", queries.len());
        targets.insert(id.clone(), gi);
        queries.push(XrefQuery {
            id: Some(id),
            term: group.term.clone(),
            specs,
        });
    }

    (queries, targets)
}

enum Resolution<'a> {
    Resolved(&'a XrefResult),
    Ambiguous,
    Unresolved,
}

/// Pick at most one hit. With a preferred spec list, scan it in order:
/// a single hit for a spec resolves immediately, two or more abort as
/// ambiguous; exhausting the list falls back to the hits no preferred
/// spec claimed. Without a preference only a unique hit resolves.
fn disambiguate<'a>(
    hits: &'a [XrefResult],
    scope: Option<&[String]>,
    default_priority: &[String],
) -> Resolution<'a> {
    if hits.is_empty() {
        return Resolution::Unresolved;
    }

    let preferred: &[String] = match scope {
        Some(s) if !s.is_empty() => s,
        _ => default_priority,
    };

    if preferred.is_empty() {
        return if hits.len() == 1 {
            Resolution::Resolved(&hits[0])
        } else {
            Resolution::Ambiguous
        };
    }

    let mut claimed = vec![false; hits.len()];
    for spec in preferred {
        let matches: Vec<usize> = hits
            .iter()
            .enumerate()
            .filter(|(_, h)| h.cite.as_deref() == Some(spec.as_str()))
            .map(|(i, _)| i)
            .collect();
        for &i in &matches {
            claimed[i] = true;
        }
        match matches.len() {
            0 => {}
            1 => return Resolution::Resolved(&hits[matches[0]]),
            _ => return Resolution::Ambiguous,
        }
    }

    let leftovers: Vec<usize> = (0..hits.len()).filter(|&i| !claimed[i]).collect();
    match leftovers.len() {
        0 => Resolution::Unresolved,
        1 => Resolution::Resolved(&hits[leftovers[0]]),
        _ => Resolution::Ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use crate::resolver::StaticResolver;
    use specmill_dom::{ScraperParser, TreeParser};
    use std::sync::Arc;

    fn hit(href: &str, cite: &str) -> XrefResult {
        XrefResult {
            href: href.into(),
            text: None,
            cite: Some(cite.into()),
        }
    }

    fn source(specs: Option<Vec<&str>>, resolver: StaticResolver) -> XrefSource {
        XrefSource {
            specs: specs.map(|s| s.into_iter().map(String::from).collect()),
            resolver: Arc::new(resolver),
        }
    }

    async fn run_xref(html: &str, sources: Vec<XrefSource>) -> (Document, Vec<String>) {
        let mut doc = ScraperParser.parse(html);
        let options = RunOptions {
            xref: sources,
            ..Default::default()
        };
        let mut ctx = PipelineContext::new(Arc::new(options));
        XrefPass
            .run(&mut doc, &mut ctx)
            .await
            .expect("xref pass never errors");
        (doc, ctx.warnings)
    }

    fn anchor_href(doc: &Document, term: &str) -> Option<String> {
        doc.elements_with_tag(&["a"])
            .into_iter()
            .find(|&a| doc.attr(a, "data-term") == Some(term))
            .and_then(|a| doc.attr(a, "href"))
            .map(String::from)
    }

    #[tokio::test]
    async fn local_definition_resolves_without_resolver() {
        let (doc, warnings) = run_xref(
            "<p><dfn>event loop</dfn></p><p><a data-term=\"Event Loop\">Event Loop</a></p>",
            vec![],
        )
        .await;
        assert_eq!(anchor_href(&doc, "Event Loop").as_deref(), Some("#event-loop"));
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn external_tier_resolves_unknown_terms() {
        let resolver =
            StaticResolver::new().with_entry("fetch", vec![hit("https://fetch.spec/#go", "fetch")]);
        let (doc, warnings) = run_xref(
            "<p><a data-term=\"fetch\">fetch</a></p>",
            vec![source(Some(vec!["fetch"]), resolver)],
        )
        .await;
        assert_eq!(
            anchor_href(&doc, "fetch").as_deref(),
            Some("https://fetch.spec/#go")
        );
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn priority_tie_break_prefers_first_listed_spec() {
        let resolver = StaticResolver::new().with_entry(
            "node",
            vec![hit("https://dom.spec/#node", "dom"), hit("https://html.spec/#node", "html")],
        );
        let (doc, warnings) = run_xref(
            "<p><a data-term=\"node\">node</a></p>",
            vec![source(Some(vec!["html", "dom"]), resolver)],
        )
        .await;
        assert_eq!(
            anchor_href(&doc, "node").as_deref(),
            Some("https://html.spec/#node")
        );
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn two_hits_for_one_preferred_spec_is_ambiguous() {
        let resolver = StaticResolver::new().with_entry(
            "context",
            vec![hit("https://html.spec/#a", "html"), hit("https://html.spec/#b", "html")],
        );
        let (doc, warnings) = run_xref(
            "<p><a data-term=\"context\">context</a></p>",
            vec![source(Some(vec!["html"]), resolver)],
        )
        .await;
        assert_eq!(anchor_href(&doc, "context"), None);
        assert_eq!(warnings, vec!["Ambiguous xref: \"context\""]);
    }

    #[tokio::test]
    async fn no_hits_warns_no_matching() {
        let (_, warnings) = run_xref(
            "<p><a data-term=\"ghost\">ghost</a></p>",
            vec![source(None, StaticResolver::new())],
        )
        .await;
        assert_eq!(warnings, vec!["No matching xref: \"ghost\""]);
    }

    #[tokio::test]
    async fn scope_override_narrows_resolution() {
        let resolver = StaticResolver::new().with_entry(
            "node",
            vec![hit("https://dom.spec/#node", "dom"), hit("https://svg.spec/#node", "svg")],
        );
        let (doc, warnings) = run_xref(
            "<section data-cite=\"svg\"><a data-term=\"node\">node</a></section>",
            vec![source(Some(vec!["dom", "svg"]), resolver)],
        )
        .await;
        assert_eq!(
            anchor_href(&doc, "node").as_deref(),
            Some("https://svg.spec/#node")
        );
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn identical_terms_share_one_resolution_and_one_warning() {
        let (doc, warnings) = run_xref(
            "<p><a data-term=\"ghost\">a</a><a data-term=\"ghost\">b</a></p>",
            vec![],
        )
        .await;
        // One bucket, one warning.
        assert_eq!(warnings, vec!["No matching xref: \"ghost\""]);
        assert_eq!(doc.elements_with_tag(&["a"]).len(), 2);
    }

    #[tokio::test]
    async fn suppressed_anchors_are_ignored() {
        let (doc, warnings) = run_xref(
            "<div class=\"no-link-warnings\"><a data-term=\"ghost\">ghost</a></div>",
            vec![],
        )
        .await;
        assert!(warnings.is_empty());
        assert_eq!(anchor_href(&doc, "ghost"), None);
    }

    #[test]
    fn fallback_to_unclaimed_remaining_hit() {
        let hits = vec![hit("https://a/#x", "aaa"), hit("https://b/#x", "bbb")];
        let preferred = vec!["zzz".to_string(), "aaa".to_string()];
        // "aaa" claims one hit uniquely -> resolved via preferred scan.
        match disambiguate(&hits, None, &preferred) {
            Resolution::Resolved(h) => assert_eq!(h.href, "https://a/#x"),
            _ => panic!("expected resolution"),
        }

        // Nothing preferred matches; exactly one unclaimed hit remains.
        let hits = vec![hit("https://b/#x", "bbb")];
        let preferred = vec!["zzz".to_string()];
        match disambiguate(&hits, None, &preferred) {
            Resolution::Resolved(h) => assert_eq!(h.href, "https://b/#x"),
            _ => panic!("expected fallback resolution"),
        }
    }
}
