//! Document outline from heading ids.
//!
//! Collects h2/h3 headings that carry an id (id-less headings are
//! skipped), renders them as a flat ordered list with depth markers, and
//! mounts the list at an existing `#toc` element when one is present.

use async_trait::async_trait;

use specmill_dom::Document;
use specmill_shared::{OutputArea, Result, TocItem};

use crate::context::{AreaOutput, Pass, PassFlow, PipelineContext, TocOutput};

pub struct TocPass;

#[async_trait]
impl Pass for TocPass {
    fn area(&self) -> OutputArea {
        OutputArea::Toc
    }

    async fn run(&self, doc: &mut Document, ctx: &mut PipelineContext) -> Result<PassFlow> {
        if !ctx.options.toc.enabled {
            return Ok(PassFlow::Continue);
        }

        let mut items = Vec::new();
        for heading in doc.elements_with_tag(&["h2", "h3"]) {
            let Some(id) = doc.attr(heading, "id").filter(|id| !id.is_empty()) else {
                continue;
            };
            let depth = if doc.tag(heading) == Some("h3") { 2 } else { 1 };
            items.push(TocItem {
                id: id.to_string(),
                text: doc.text_content(heading).trim().to_string(),
                depth,
            });
        }

        if items.is_empty() {
            ctx.outputs
                .insert(OutputArea::Toc, AreaOutput::Toc(TocOutput::default()));
            return Ok(PassFlow::Continue);
        }

        let list = doc.create_element("ol");
        doc.set_attr(list, "role", "list");
        for item in &items {
            let li = doc.create_element("li");
            doc.set_attr(li, "data-depth", &item.depth.to_string());
            let link = doc.create_element("a");
            doc.set_attr(link, "href", &format!("#{}", item.id));
            let text = doc.create_text(&item.text);
            doc.append_child(link, text);
            doc.append_child(li, link);
            doc.append_child(list, li);
        }

        let html = doc.node_html(list);
        if let Some(mount) = doc.element_by_id("toc") {
            doc.clear_children(mount);
            doc.append_child(mount, list);
        }

        ctx.outputs
            .insert(OutputArea::Toc, AreaOutput::Toc(TocOutput { items, html }));
        Ok(PassFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{RunOptions, TocOptions};
    use specmill_dom::{ScraperParser, TreeParser};
    use std::sync::Arc;

    async fn run_toc(html: &str, enabled: bool) -> (Document, PipelineContext) {
        let mut doc = ScraperParser.parse(html);
        let options = RunOptions {
            toc: TocOptions { enabled },
            ..Default::default()
        };
        let mut ctx = PipelineContext::new(Arc::new(options));
        TocPass
            .run(&mut doc, &mut ctx)
            .await
            .expect("toc pass never errors");
        (doc, ctx)
    }

    fn output(ctx: &PipelineContext) -> &TocOutput {
        match &ctx.outputs[&OutputArea::Toc] {
            AreaOutput::Toc(out) => out,
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[tokio::test]
    async fn collects_headings_with_ids_in_order() {
        let (_, ctx) = run_toc(
            "<h2 id=\"one\">One</h2><h3 id=\"one-a\">One A</h3><h2 id=\"two\">Two</h2>",
            true,
        )
        .await;
        let out = output(&ctx);
        assert_eq!(
            out.items,
            vec![
                TocItem { id: "one".into(), text: "One".into(), depth: 1 },
                TocItem { id: "one-a".into(), text: "One A".into(), depth: 2 },
                TocItem { id: "two".into(), text: "Two".into(), depth: 1 },
            ]
        );
        assert!(out.html.contains("href=\"#one-a\""));
        assert!(out.html.contains("data-depth=\"2\""));
    }

    #[tokio::test]
    async fn headings_without_ids_are_skipped() {
        let (_, ctx) = run_toc("<h2>No Id</h2><h2 id=\"kept\">Kept</h2>", true).await;
        let out = output(&ctx);
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].id, "kept");
    }

    #[tokio::test]
    async fn mounts_into_existing_toc_element() {
        let (doc, _) = run_toc(
            "<nav id=\"toc\"><p>placeholder</p></nav><h2 id=\"a\">A</h2>",
            true,
        )
        .await;
        let mount = doc.element_by_id("toc").expect("mount");
        let html = doc.node_html(mount);
        assert!(html.contains("<ol"));
        assert!(!html.contains("placeholder"));
    }

    #[tokio::test]
    async fn disabled_toc_produces_no_output() {
        let (_, ctx) = run_toc("<h2 id=\"a\">A</h2>", false).await;
        assert!(!ctx.outputs.contains_key(&OutputArea::Toc));
    }
}
