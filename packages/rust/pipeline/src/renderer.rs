//! Document-level orchestration: assemble the working tree, schedule the
//! stale areas, run the pass chain, and hand the results back.
//!
//! The [`Processor`] owns the collaborators (tree parser, include loader,
//! format registry, pass list) but no cross-run state; the previous
//! configuration snapshot lives in the caller-held [`Session`], so runs
//! against different sessions are independent by construction.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};
use url::Url;

use specmill_dom::{Document, NodeId, ScraperParser, TreeParser};
use specmill_markdown::MarkdownOptions;
use specmill_shared::{
    AssertionItem, Citation, ConfigSnapshot, OutputArea, ProcessingStats, Result,
};

use crate::context::{AreaOutput, BoilerplateOutput, Pass, RunOptions};
use crate::format::FormatRegistry;
use crate::include::{FileLoader, FsLoader, IncludeProcessor};
use crate::runner::Postprocessor;
use crate::scheduler::Session;

/// Hook invoked with the final tree and outputs after all passes ran.
pub type PostProcessHook =
    Arc<dyn Fn(&Document, &BTreeMap<OutputArea, AreaOutput>) + Send + Sync>;

/// Caller-supplied document inputs for one render.
#[derive(Clone, Default)]
pub struct DocumentConfig {
    /// Section fragments, in document order.
    pub sections: Vec<String>,
    /// Optional header fragment, placed before the sections.
    pub header: Option<String>,
    /// Optional "status of this document" fragment.
    pub sotd: Option<String>,
    /// Passthrough pubrules fragment.
    pub pubrules: Option<String>,
    /// Passthrough legal fragment.
    pub legal: Option<String>,
    /// Arbitrary metadata returned unchanged.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Hook invoked with `(tree, outputs)` after the pipeline completes.
    pub post_process: Option<PostProcessHook>,
}

impl DocumentConfig {
    /// The snapshot the incremental scheduler compares between runs.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            sections: self.sections.clone(),
            header: self.header.clone(),
            sotd: self.sotd.clone(),
            pubrules: self.pubrules.clone(),
            legal: self.legal.clone(),
        }
    }
}

/// Result of one document render.
#[derive(Clone, Default)]
pub struct RenderResult {
    /// Serialized top-level elements, header/sotd excluded. Includes
    /// sections the passes appended (references, boilerplate).
    pub sections: Vec<String>,
    pub header: Option<String>,
    pub sotd: Option<String>,
    pub pubrules: Option<String>,
    pub legal: Option<String>,
    /// Rendered outline, when the toc pass ran.
    pub toc: Option<String>,
    /// Rendered references section, when the references pass ran.
    pub references: Option<String>,
    /// Injected standard sections, when the boilerplate pass ran.
    pub boilerplate: Option<BoilerplateOutput>,
    /// Extracted assertions, empty unless the assertions pass ran.
    pub assertions: Vec<AssertionItem>,
    /// Citations surfaced by markdown conversion, in source order.
    pub citations: Vec<Citation>,
    /// Caller metadata, returned unchanged.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// The full typed output map for callers that need other areas.
    pub outputs: BTreeMap<OutputArea, AreaOutput>,
    pub warnings: Vec<String>,
    pub stats: ProcessingStats,
}

/// Construction options for a [`Processor`].
pub struct ProcessorOptions {
    /// Base URL for id defaults (assertions) and documentation links.
    pub base_url: Option<Url>,
    /// Directory include paths resolve against.
    pub base_dir: Option<PathBuf>,
    /// Injectable file access; defaults to the local filesystem.
    pub loader: Option<Arc<dyn FileLoader>>,
    /// Markdown conversion options.
    pub markdown: MarkdownOptions,
    /// Per-area pass options.
    pub run: RunOptions,
    /// Swappable markup parser; defaults to the scraper-backed one.
    pub parser: Option<Arc<dyn TreeParser>>,
    /// Pass list override, used by tests; defaults to the standard chain.
    pub passes: Option<Vec<Box<dyn Pass>>>,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            base_dir: None,
            loader: None,
            markdown: MarkdownOptions::default(),
            run: RunOptions::default(),
            parser: None,
            passes: None,
        }
    }
}

/// The document processor: one instance serves any number of renders.
pub struct Processor {
    parser: Arc<dyn TreeParser>,
    includes: IncludeProcessor,
    formats: FormatRegistry,
    postprocessor: Postprocessor,
    run_options: Arc<RunOptions>,
}

impl Processor {
    pub fn new(options: ProcessorOptions) -> Self {
        let parser: Arc<dyn TreeParser> =
            options.parser.unwrap_or_else(|| Arc::new(ScraperParser));
        let loader: Arc<dyn FileLoader> = options.loader.unwrap_or_else(|| Arc::new(FsLoader));
        let includes = IncludeProcessor::new(options.base_dir, loader);
        let formats = FormatRegistry::standard(options.markdown);
        let postprocessor = match options.passes {
            Some(passes) => Postprocessor::new(passes),
            None => Postprocessor::standard(),
        };

        let mut run = options.run;
        if run.base_url.is_none() {
            run.base_url = options.base_url;
        }

        Self {
            parser,
            includes,
            formats,
            postprocessor,
            run_options: Arc::new(run),
        }
    }

    /// Render with the full area set (filtered by what actually changed).
    pub async fn render(
        &self,
        config: &DocumentConfig,
        session: &mut Session,
    ) -> Result<RenderResult> {
        self.render_areas(config, session, None).await
    }

    /// Render, restricting execution to `requested ∩ changed` areas.
    #[instrument(skip_all, fields(sections = config.sections.len()))]
    pub async fn render_areas(
        &self,
        config: &DocumentConfig,
        session: &mut Session,
        requested: Option<&BTreeSet<OutputArea>>,
    ) -> Result<RenderResult> {
        let start = Instant::now();
        let mut stats = ProcessingStats::default();
        let mut warnings = Vec::new();
        let mut citations = Vec::new();

        let snapshot = config.snapshot();
        let changed = session.advance(&snapshot);
        let areas: BTreeSet<OutputArea> = match requested {
            Some(requested) => requested.intersection(&changed).copied().collect(),
            None => changed,
        };

        // Assemble the working tree: header, sotd, then the sections.
        let mut doc = Document::new();
        let root = doc.root();
        let header_nodes = self.import(&mut doc, root, config.header.as_deref());
        let sotd_nodes = self.import(&mut doc, root, config.sotd.as_deref());
        for section in &config.sections {
            self.import(&mut doc, root, Some(section));
        }
        stats.elements_processed = config.sections.len();

        // Element-level processing before the semantic passes.
        self.includes
            .process_tree(
                &mut doc,
                &self.formats,
                self.parser.as_ref(),
                &mut stats,
                &mut warnings,
                &mut citations,
            )
            .await?;
        self.process_formats(&mut doc, &mut stats, &mut citations)?;

        let run = self
            .postprocessor
            .run(&mut doc, Some(&areas), self.run_options.clone())
            .await;
        warnings.extend(run.warnings);

        if let Some(hook) = &config.post_process {
            hook(&doc, &run.outputs);
        }

        // Pull the convenience views out of the typed output map.
        let toc = match run.outputs.get(&OutputArea::Toc) {
            Some(AreaOutput::Toc(out)) => Some(out.html.clone()),
            _ => None,
        };
        let references = match run.outputs.get(&OutputArea::References) {
            Some(AreaOutput::References(html)) => Some(html.clone()),
            _ => None,
        };
        let boilerplate = match run.outputs.get(&OutputArea::Boilerplate) {
            Some(AreaOutput::Boilerplate(out)) => Some(out.clone()),
            _ => None,
        };
        let assertions = match run.outputs.get(&OutputArea::Assertions) {
            Some(AreaOutput::Assertions(items)) => items.clone(),
            _ => Vec::new(),
        };

        let excluded: HashSet<NodeId> =
            header_nodes.iter().chain(sotd_nodes.iter()).copied().collect();
        let sections = doc
            .children(root)
            .iter()
            .filter(|&&id| !excluded.contains(&id))
            .map(|&id| doc.node_html(id))
            .collect();

        stats.processing_time_ms = start.elapsed().as_millis();
        info!(
            areas = areas.len(),
            warnings = warnings.len(),
            elapsed_ms = stats.processing_time_ms,
            "render complete"
        );

        Ok(RenderResult {
            sections,
            header: serialize_nodes(&doc, &header_nodes),
            sotd: serialize_nodes(&doc, &sotd_nodes),
            pubrules: config.pubrules.clone(),
            legal: config.legal.clone(),
            toc,
            references,
            boilerplate,
            assertions,
            citations,
            metadata: config.metadata.clone(),
            outputs: run.outputs,
            warnings,
            stats,
        })
    }

    /// Parse a fragment and graft it under `parent`, returning the new
    /// top-level nodes.
    fn import(&self, doc: &mut Document, parent: NodeId, fragment: Option<&str>) -> Vec<NodeId> {
        let Some(fragment) = fragment else {
            return Vec::new();
        };
        let before = doc.children(parent).len();
        let parsed = self.parser.parse(fragment);
        doc.import_fragment(parent, &parsed);
        doc.children(parent)[before..].to_vec()
    }

    /// Convert `data-format` annotated elements in place.
    fn process_formats(
        &self,
        doc: &mut Document,
        stats: &mut ProcessingStats,
        citations: &mut Vec<Citation>,
    ) -> Result<()> {
        let targets: Vec<NodeId> = doc
            .elements()
            .into_iter()
            .filter(|&el| doc.attr(el, "data-format").is_some())
            .collect();

        for element in targets {
            let format = doc
                .attr(element, "data-format")
                .unwrap_or_default()
                .to_string();
            doc.remove_attr(element, "data-format");

            let content = crate::text::strip_indent(&doc.text_content(element))
                .trim()
                .to_string();
            if content.is_empty() {
                continue;
            }
            let converted = self.formats.convert(&content, &format)?;
            if format == "markdown" {
                stats.markdown_blocks += 1;
            }
            citations.extend(converted.citations);

            let fragment = self.parser.parse(&converted.html);
            doc.clear_children(element);
            doc.import_fragment(element, &fragment);
        }
        Ok(())
    }
}

fn serialize_nodes(doc: &Document, nodes: &[NodeId]) -> Option<String> {
    if nodes.is_empty() {
        return None;
    }
    Some(nodes.iter().map(|&id| doc.node_html(id)).collect())
}
