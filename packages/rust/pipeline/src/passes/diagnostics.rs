//! Consistency sweeps over the final anchor set.
//!
//! Runs late so it observes every id and href the earlier passes
//! produced. Two checks: duplicate element ids (one warning per repeated
//! id) and annotation anchors that never received an href.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use specmill_dom::Document;
use specmill_shared::{OutputArea, Result};

use crate::context::{Pass, PassFlow, PipelineContext};

pub struct DiagnosticsPass;

#[async_trait]
impl Pass for DiagnosticsPass {
    fn area(&self) -> OutputArea {
        OutputArea::Diagnostics
    }

    async fn run(&self, doc: &mut Document, ctx: &mut PipelineContext) -> Result<PassFlow> {
        if !ctx.options.diagnostics.ids_and_links {
            return Ok(PassFlow::Continue);
        }
        let suppress_class = ctx.options.diagnostics.suppress_class.clone();

        // Duplicate ids: warn once per repeated id, on its first repeat
        // outside the suppression scope.
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut warned: HashSet<String> = HashSet::new();
        for element in doc.elements() {
            let Some(id) = doc.attr(element, "id").filter(|id| !id.is_empty()) else {
                continue;
            };
            let id = id.to_string();
            let count = seen.entry(id.clone()).or_insert(0);
            *count += 1;
            if *count > 1 && !warned.contains(&id) && !doc.in_class_scope(element, &suppress_class)
            {
                ctx.warn(format!("Duplicate id: \"{id}\""));
                warned.insert(id);
            }
        }

        // Annotation anchors that no pass resolved.
        for anchor in doc.elements_with_tag(&["a"]) {
            if doc.in_class_scope(anchor, &suppress_class) {
                continue;
            }
            let has_href = doc.attr(anchor, "href").is_some_and(|href| !href.is_empty());
            if has_href {
                continue;
            }
            let label = doc
                .attr(anchor, "data-term")
                .or_else(|| doc.attr(anchor, "data-idl"))
                .or_else(|| doc.attr(anchor, "data-spec"));
            if let Some(label) = label {
                ctx.warn(format!(
                    "Unresolved link placeholder: \"{}\"",
                    label.trim()
                ));
            }
        }

        Ok(PassFlow::Continue)
    }
}
