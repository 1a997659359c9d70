//! The pass contract and the shared state flowing between passes.
//!
//! A [`Pass`] is the unit of pipeline work: it mutates the working tree,
//! may write one typed result into its output area, and appends warnings.
//! Passes communicate only through the tree and the [`PipelineContext`];
//! the runner guarantees strictly sequential execution so every pass sees
//! the edits of the passes before it.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use specmill_dom::Document;
use specmill_shared::{AssertionItem, BiblioEntry, OutputArea, Result, TocItem};

use crate::resolver::XrefSource;

// ---------------------------------------------------------------------------
// Pass contract
// ---------------------------------------------------------------------------

/// Whether the runner should keep executing later passes.
///
/// Production passes always continue; `Stop` exists for callers (and
/// tests) that install short-circuiting passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassFlow {
    Continue,
    Stop,
}

/// One pipeline pass.
#[async_trait]
pub trait Pass: Send + Sync {
    /// The output area this pass is responsible for.
    fn area(&self) -> OutputArea;

    /// Execute against the working tree and shared context.
    async fn run(&self, doc: &mut Document, ctx: &mut PipelineContext) -> Result<PassFlow>;
}

// ---------------------------------------------------------------------------
// Typed pass outputs
// ---------------------------------------------------------------------------

/// One anchor target produced by the interface indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdlTarget {
    /// Document-unique anchor id actually assigned in the tree.
    pub id: String,
    /// Index key: `name` or `interface.member`, lower-cased.
    pub key: String,
    /// Display text, as written.
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct IdlOutput {
    pub targets: Vec<IdlTarget>,
}

#[derive(Debug, Clone, Default)]
pub struct TocOutput {
    pub items: Vec<TocItem>,
    /// Rendered `<ol>` markup, empty when the document has no outline.
    pub html: String,
}

/// Descriptor of one injected standard section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoilerplateSectionInfo {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Default)]
pub struct BoilerplateOutput {
    pub sections: Vec<BoilerplateSectionInfo>,
}

/// Tagged result slot, one variant per producing area. Consumers match on
/// the variant instead of downcasting an untyped map entry.
#[derive(Debug, Clone)]
pub enum AreaOutput {
    Idl(IdlOutput),
    Toc(TocOutput),
    /// Rendered references section markup.
    References(String),
    Boilerplate(BoilerplateOutput),
    Assertions(Vec<AssertionItem>),
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Bibliography database handed in by the caller.
#[derive(Clone, Default)]
pub struct BiblioOptions {
    /// Entries keyed by citation id.
    pub entries: BTreeMap<String, BiblioEntry>,
}

#[derive(Clone)]
pub struct TocOptions {
    pub enabled: bool,
}

impl Default for TocOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone)]
pub struct DiagnosticsOptions {
    /// Elements inside this class are exempt from link/id warnings.
    pub suppress_class: String,
    /// Run the duplicate-id and unresolved-placeholder sweeps.
    pub ids_and_links: bool,
}

impl Default for DiagnosticsOptions {
    fn default() -> Self {
        Self {
            suppress_class: "no-link-warnings".into(),
            ids_and_links: true,
        }
    }
}

/// Where injected boilerplate sections are mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoilerplateMount {
    #[default]
    End,
    BeforeReferences,
    AfterToc,
}

/// Per-section overrides for one standard section.
#[derive(Clone, Default)]
pub struct BoilerplateSectionOptions {
    pub title: Option<String>,
    pub id: Option<String>,
    pub content: Option<String>,
}

#[derive(Clone, Default)]
pub struct BoilerplateOptions {
    /// Enabled standard sections; `None` leaves a section out.
    pub conformance: Option<BoilerplateSectionOptions>,
    pub security: Option<BoilerplateSectionOptions>,
    pub privacy: Option<BoilerplateSectionOptions>,
    pub mount: BoilerplateMount,
}

#[derive(Clone, Default)]
pub struct AssertionOptions {
    /// Spec shortname for standardized ids; defaults from the base URL.
    pub spec: Option<String>,
    /// Version string; its leading digits become the major version.
    pub version: Option<String>,
}

/// Everything the passes read from the caller for one run.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Base URL of the document, used for id defaults and include paths.
    pub base_url: Option<Url>,
    /// External resolvers in registration (priority) order.
    pub xref: Vec<XrefSource>,
    pub biblio: BiblioOptions,
    pub toc: TocOptions,
    pub diagnostics: DiagnosticsOptions,
    pub boilerplate: BoilerplateOptions,
    pub assertions: AssertionOptions,
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Shared mutable state for one pipeline run. Created by the runner,
/// discarded when the run ends; the outputs map is handed to the caller.
pub struct PipelineContext {
    /// One typed slot per output area, written at most once per run.
    pub outputs: BTreeMap<OutputArea, AreaOutput>,
    /// Accumulated warnings, in source order, never deduplicated.
    pub warnings: Vec<String>,
    /// Caller options for this run.
    pub options: Arc<RunOptions>,
}

impl PipelineContext {
    pub fn new(options: Arc<RunOptions>) -> Self {
        Self {
            outputs: BTreeMap::new(),
            warnings: Vec::new(),
            options,
        }
    }

    /// Append one warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}
