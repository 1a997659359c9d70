//! Reference section assembly from in-text citations.
//!
//! Citations are deduplicated by id into normative and informative sets
//! (normative wins when an id appears in both), rendered as two sublists
//! sorted lexicographically by id for reproducibility, and every in-text
//! citation is rewritten to point at its `bib-<id>` list item.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::debug;

use specmill_dom::{Document, NodeId};
use specmill_shared::{BiblioEntry, OutputArea, Result};

use crate::context::{AreaOutput, Pass, PassFlow, PipelineContext};

pub struct ReferencesPass;

#[async_trait]
impl Pass for ReferencesPass {
    fn area(&self) -> OutputArea {
        OutputArea::References
    }

    async fn run(&self, doc: &mut Document, ctx: &mut PipelineContext) -> Result<PassFlow> {
        let cites: Vec<NodeId> = doc
            .elements_with_tag(&["a"])
            .into_iter()
            .filter(|&a| doc.attr(a, "data-spec").is_some_and(|id| !id.is_empty()))
            .collect();
        if cites.is_empty() {
            return Ok(PassFlow::Continue);
        }

        let mut normative = BTreeSet::new();
        let mut informative = BTreeSet::new();
        for &cite in &cites {
            let id = doc.attr(cite, "data-spec").unwrap_or_default().to_string();
            if doc.attr(cite, "data-normative") == Some("true") {
                normative.insert(id);
            } else {
                informative.insert(id);
            }
        }
        // Normative wins: an id cited normatively anywhere leaves the
        // informative set.
        informative.retain(|id| !normative.contains(id));

        debug!(
            normative = normative.len(),
            informative = informative.len(),
            "assembling references section"
        );

        // Mount at an existing #references element or append a new one.
        let section = match doc.element_by_id("references") {
            Some(existing) => {
                doc.clear_children(existing);
                existing
            }
            None => {
                let section = doc.create_element("section");
                doc.set_attr(section, "id", "references");
                let root = doc.root();
                doc.append_child(root, section);
                section
            }
        };

        let heading = doc.create_element("h2");
        let heading_text = doc.create_text("References");
        doc.append_child(heading, heading_text);
        doc.append_child(section, heading);

        let mut warnings = Vec::new();
        render_sublist(
            doc,
            section,
            "normative-references",
            "Normative references",
            &normative,
            &ctx.options.biblio.entries,
            &mut warnings,
        );
        render_sublist(
            doc,
            section,
            "informative-references",
            "Informative references",
            &informative,
            &ctx.options.biblio.entries,
            &mut warnings,
        );
        ctx.warnings.extend(warnings);

        // Link citations back to their list items, regardless of whether
        // the entry resolved.
        for &cite in &cites {
            let id = doc.attr(cite, "data-spec").unwrap_or_default().to_string();
            doc.set_attr(cite, "href", &format!("#bib-{}", id.to_lowercase()));
        }

        let rendered = doc.node_html(section);
        ctx.outputs
            .insert(OutputArea::References, AreaOutput::References(rendered));
        Ok(PassFlow::Continue)
    }
}

fn render_sublist(
    doc: &mut Document,
    parent: NodeId,
    section_id: &str,
    title: &str,
    ids: &BTreeSet<String>,
    entries: &std::collections::BTreeMap<String, BiblioEntry>,
    warnings: &mut Vec<String>,
) {
    let sub = doc.create_element("section");
    doc.set_attr(sub, "id", section_id);
    let heading = doc.create_element("h3");
    let heading_text = doc.create_text(title);
    doc.append_child(heading, heading_text);
    doc.append_child(sub, heading);

    let list = doc.create_element("ul");
    // BTreeSet iteration gives the lexicographic order the output
    // format requires.
    for id in ids {
        let item = doc.create_element("li");
        doc.set_attr(item, "id", &format!("bib-{}", id.to_lowercase()));

        let label = doc.create_element("span");
        doc.set_attr(label, "class", "ref-id");
        let label_text = doc.create_text(&format!("[{id}]"));
        doc.append_child(label, label_text);
        doc.append_child(item, label);
        let gap = doc.create_text(" ");
        doc.append_child(item, gap);

        match entries.get(id).filter(|e| e.title.is_some() || e.href.is_some()) {
            Some(entry) => render_entry(doc, item, id, entry),
            None => {
                doc.set_attr(item, "data-spec", id);
                let missing = doc.create_element("span");
                doc.set_attr(missing, "class", "ref-missing");
                let missing_text = doc.create_text("— unresolved reference");
                doc.append_child(missing, missing_text);
                doc.append_child(item, missing);
                // One warning per missing id, not per citation instance.
                warnings.push(format!("Unresolved reference: \"{id}\""));
            }
        }
        doc.append_child(list, item);
    }
    doc.append_child(sub, list);
    doc.append_child(parent, sub);
}

fn render_entry(doc: &mut Document, item: NodeId, id: &str, entry: &BiblioEntry) {
    let title = entry.title.clone().unwrap_or_else(|| id.to_string());
    match &entry.href {
        Some(href) => {
            let link = doc.create_element("a");
            doc.set_attr(link, "href", href);
            let text = doc.create_text(&title);
            doc.append_child(link, text);
            doc.append_child(item, link);
        }
        None => {
            let span = doc.create_element("span");
            doc.set_attr(span, "class", "ref-title");
            let text = doc.create_text(&title);
            doc.append_child(span, text);
            doc.append_child(item, span);
        }
    }

    let meta: Vec<&str> = [&entry.publisher, &entry.status, &entry.date]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .collect();
    if !meta.is_empty() {
        let span = doc.create_element("span");
        doc.set_attr(span, "class", "ref-meta");
        let text = doc.create_text(&format!(" — {}", meta.join(", ")));
        doc.append_child(span, text);
        doc.append_child(item, span);
    }
}
