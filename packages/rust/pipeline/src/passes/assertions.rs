//! Normative assertion extraction.
//!
//! Finds RFC 2119 keyword markers, groups them by their nearest enclosing
//! block, and assigns sequential standardized ids in document order. A
//! block with several keywords yields exactly one assertion typed by the
//! first keyword, plus a warning. Every assertion block gets a permanent
//! `data-assertion-id` attribute and an anchorable id.

use std::collections::HashMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;
use url::Url;

use specmill_dom::{Document, NodeId};
use specmill_shared::{AssertionItem, NormativeKeyword, OutputArea, Result};

use crate::context::{AreaOutput, Pass, PassFlow, PipelineContext};
use crate::text::{collapse_ws, snippet};

/// Elements treated as assertion-carrying blocks.
const BLOCK_TAGS: &[&str] = &["p", "li", "dd", "dt", "td", "th", "blockquote"];

/// Maximum snippet length, ellipsis included.
const SNIPPET_MAX: usize = 200;

pub struct AssertionsPass;

#[async_trait]
impl Pass for AssertionsPass {
    fn area(&self) -> OutputArea {
        OutputArea::Assertions
    }

    async fn run(&self, doc: &mut Document, ctx: &mut PipelineContext) -> Result<PassFlow> {
        let (spec, major) = id_prefix(ctx);

        // Group markers by their enclosing block; marker traversal is in
        // document order, so per-block keyword lists are in source order.
        let mut keywords_by_block: HashMap<NodeId, Vec<NormativeKeyword>> = HashMap::new();
        for marker in doc.elements_with_tag(&["em"]) {
            if !doc.has_class(marker, "rfc2119") {
                continue;
            }
            let text = collapse_ws(&doc.text_content(marker)).to_uppercase();
            let Some(keyword) = NormativeKeyword::parse(&text) else {
                continue;
            };
            let Some(block) = doc.closest(marker, |d, n| {
                d.tag(n).is_some_and(|t| BLOCK_TAGS.contains(&t))
            }) else {
                continue;
            };
            keywords_by_block.entry(block).or_default().push(keyword);
        }

        if keywords_by_block.is_empty() {
            ctx.outputs
                .insert(OutputArea::Assertions, AreaOutput::Assertions(Vec::new()));
            return Ok(PassFlow::Continue);
        }

        // Visit blocks in document order, not map order.
        let blocks: Vec<NodeId> = doc
            .elements_with_tag(BLOCK_TAGS)
            .into_iter()
            .filter(|block| keywords_by_block.contains_key(block))
            .collect();

        let mut items = Vec::new();
        for (seq, block) in blocks.iter().enumerate() {
            let keywords = &keywords_by_block[block];
            let block_snippet = snippet(&doc.text_content(*block), SNIPPET_MAX);

            if keywords.len() > 1 {
                let listed = keywords
                    .iter()
                    .map(|k| k.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                ctx.warn(format!(
                    "Multiple normative keywords ({listed}) in block: \"{block_snippet}\""
                ));
            }
            let keyword = keywords[0];

            let standard_id = format!("{spec}-{major}-{:03}", seq + 1);

            let anchor_id = match doc.attr(*block, "id").filter(|id| !id.is_empty()) {
                Some(existing) => existing.to_string(),
                None => {
                    let id = doc.unique_id(&standard_id);
                    doc.set_attr(*block, "id", &id);
                    id
                }
            };
            doc.set_attr(*block, "data-assertion-id", &standard_id);

            items.push(AssertionItem {
                id: standard_id,
                anchor_id,
                keyword,
                snippet: block_snippet,
            });
        }

        debug!(assertions = items.len(), "assertions extracted");
        ctx.outputs
            .insert(OutputArea::Assertions, AreaOutput::Assertions(items));
        Ok(PassFlow::Continue)
    }
}

/// Spec shortname (upper-cased) and major version for standardized ids,
/// from options or the last two base-URL path segments.
fn id_prefix(ctx: &PipelineContext) -> (String, String) {
    static MAJOR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^(\d+)").expect("valid regex"));

    let from_url = ctx.options.base_url.as_ref().and_then(spec_version_from_url);
    let (url_spec, url_version) = from_url.unzip();

    let spec = ctx
        .options
        .assertions
        .spec
        .clone()
        .or(url_spec)
        .unwrap_or_else(|| "SPEC".to_string())
        .to_uppercase();
    let version = ctx
        .options
        .assertions
        .version
        .clone()
        .or(url_version)
        .unwrap_or_else(|| "0".to_string());
    let major = MAJOR_RE
        .captures(&version)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| "0".to_string());

    (spec, major)
}

/// `…/<spec>/<version>/` from a base URL's path.
fn spec_version_from_url(url: &Url) -> Option<(String, String)> {
    let segments: Vec<&str> = url
        .path()
        .trim_end_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let n = segments.len();
    if n >= 2 {
        Some((segments[n - 2].to_string(), segments[n - 1].to_string()))
    } else {
        None
    }
}
