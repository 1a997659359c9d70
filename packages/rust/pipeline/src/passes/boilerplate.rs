//! Standard-section injection (conformance, security, privacy).
//!
//! Each enabled section is created with its default or overridden
//! id/title/content and mounted at the configured position. Existing
//! sections with the same id are never overwritten.

use async_trait::async_trait;

use specmill_dom::{Document, NodeId};
use specmill_shared::{OutputArea, Result};

use crate::context::{
    AreaOutput, BoilerplateMount, BoilerplateOutput, BoilerplateSectionInfo,
    BoilerplateSectionOptions, Pass, PassFlow, PipelineContext,
};

pub struct BoilerplatePass;

#[async_trait]
impl Pass for BoilerplatePass {
    fn area(&self) -> OutputArea {
        OutputArea::Boilerplate
    }

    async fn run(&self, doc: &mut Document, ctx: &mut PipelineContext) -> Result<PassFlow> {
        let bp = ctx.options.boilerplate.clone();

        let mount_ref = match bp.mount {
            BoilerplateMount::End => None,
            BoilerplateMount::BeforeReferences => doc.element_by_id("references"),
            BoilerplateMount::AfterToc => doc.element_by_id("toc").and_then(|toc| doc.next_sibling(toc)),
        };

        let standard: [(&str, &str, &Option<BoilerplateSectionOptions>); 3] = [
            ("conformance", "Conformance", &bp.conformance),
            ("security", "Security", &bp.security),
            ("privacy", "Privacy", &bp.privacy),
        ];

        let mut sections = Vec::new();
        for (default_id, default_title, config) in standard {
            let Some(config) = config else { continue };
            let id = config.id.clone().unwrap_or_else(|| default_id.to_string());
            if doc.element_by_id(&id).is_some() {
                continue;
            }
            let title = config
                .title
                .clone()
                .unwrap_or_else(|| default_title.to_string());

            let section = build_section(doc, &id, &title, config.content.as_deref());
            match mount_ref {
                Some(reference) => doc.insert_before(reference, section),
                None => {
                    let root = doc.root();
                    doc.append_child(root, section);
                }
            }
            sections.push(BoilerplateSectionInfo { id, title });
        }

        ctx.outputs.insert(
            OutputArea::Boilerplate,
            AreaOutput::Boilerplate(BoilerplateOutput { sections }),
        );
        Ok(PassFlow::Continue)
    }
}

fn build_section(doc: &mut Document, id: &str, title: &str, content: Option<&str>) -> NodeId {
    let section = doc.create_element("section");
    doc.set_attr(section, "id", id);
    let heading = doc.create_element("h2");
    let heading_text = doc.create_text(title);
    doc.append_child(heading, heading_text);
    doc.append_child(section, heading);
    if let Some(content) = content {
        let para = doc.create_element("p");
        let text = doc.create_text(content);
        doc.append_child(para, text);
        doc.append_child(section, para);
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BoilerplateOptions, RunOptions};
    use specmill_dom::{ScraperParser, TreeParser};
    use std::sync::Arc;

    async fn run_bp(html: &str, boilerplate: BoilerplateOptions) -> (Document, PipelineContext) {
        let mut doc = ScraperParser.parse(html);
        let options = RunOptions {
            boilerplate,
            ..Default::default()
        };
        let mut ctx = PipelineContext::new(Arc::new(options));
        BoilerplatePass
            .run(&mut doc, &mut ctx)
            .await
            .expect("boilerplate pass never errors");
        (doc, ctx)
    }

    fn output(ctx: &PipelineContext) -> &BoilerplateOutput {
        match &ctx.outputs[&OutputArea::Boilerplate] {
            AreaOutput::Boilerplate(out) => out,
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[tokio::test]
    async fn injects_enabled_sections_at_end() {
        let opts = BoilerplateOptions {
            conformance: Some(Default::default()),
            security: Some(BoilerplateSectionOptions {
                content: Some("Threat model considerations.".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (doc, ctx) = run_bp("<p>body</p>", opts).await;

        assert!(doc.element_by_id("conformance").is_some());
        assert!(doc.element_by_id("security").is_some());
        assert!(doc.element_by_id("privacy").is_none());
        assert!(doc.to_html().contains("Threat model considerations."));
        assert_eq!(output(&ctx).sections.len(), 2);
        assert_eq!(output(&ctx).sections[0].title, "Conformance");
    }

    #[tokio::test]
    async fn existing_section_is_not_overwritten() {
        let opts = BoilerplateOptions {
            conformance: Some(Default::default()),
            ..Default::default()
        };
        let (doc, ctx) =
            run_bp("<section id=\"conformance\"><p>authored</p></section>", opts).await;

        assert!(doc.to_html().contains("authored"));
        assert!(output(&ctx).sections.is_empty());
    }

    #[tokio::test]
    async fn mounts_before_references() {
        let opts = BoilerplateOptions {
            conformance: Some(Default::default()),
            mount: BoilerplateMount::BeforeReferences,
            ..Default::default()
        };
        let (doc, _) = run_bp("<p>body</p><section id=\"references\"></section>", opts).await;

        let html = doc.to_html();
        let conformance = html.find("id=\"conformance\"").expect("injected");
        let references = html.find("id=\"references\"").expect("present");
        assert!(conformance < references);
    }

    #[tokio::test]
    async fn overrides_id_and_title() {
        let opts = BoilerplateOptions {
            privacy: Some(BoilerplateSectionOptions {
                id: Some("privacy-considerations".into()),
                title: Some("Privacy Considerations".into()),
                content: None,
            }),
            ..Default::default()
        };
        let (doc, ctx) = run_bp("<p>x</p>", opts).await;
        assert!(doc.element_by_id("privacy-considerations").is_some());
        assert_eq!(output(&ctx).sections[0].title, "Privacy Considerations");
    }
}
