//! The specmill post-processing core.
//!
//! Turns an annotated document tree into a fully cross-referenced,
//! self-consistent document by running a sequence of semantic-annotation
//! passes over it:
//!
//! 1. interface indexing ([`passes::IdlPass`])
//! 2. terminology cross-referencing ([`passes::XrefPass`])
//! 3. bibliography assembly ([`passes::ReferencesPass`])
//! 4. standard-section injection ([`passes::BoilerplatePass`])
//! 5. outline construction ([`passes::TocPass`])
//! 6. consistency diagnostics ([`passes::DiagnosticsPass`])
//! 7. normative assertion extraction ([`passes::AssertionsPass`])
//!
//! Entry point: build a [`Processor`], hold a [`Session`] per logical
//! document, and call [`Processor::render`] with a [`DocumentConfig`].
//! Re-renders with an unchanged configuration are free — the incremental
//! scheduler skips every up-to-date output area.

pub mod context;
pub mod format;
pub mod idl;
pub mod include;
pub mod local_map;
pub mod passes;
pub mod renderer;
pub mod resolver;
pub mod runner;
pub mod scheduler;

mod text;

pub use context::{
    AreaOutput, AssertionOptions, BiblioOptions, BoilerplateMount, BoilerplateOptions,
    BoilerplateOutput, BoilerplateSectionInfo, BoilerplateSectionOptions, DiagnosticsOptions,
    IdlOutput, IdlTarget, Pass, PassFlow, PipelineContext, RunOptions, TocOptions, TocOutput,
};
pub use include::{FileLoader, FsLoader};
pub use renderer::{DocumentConfig, PostProcessHook, Processor, ProcessorOptions, RenderResult};
pub use resolver::{RemoteResolver, StaticResolver, XrefResolver, XrefSource};
pub use runner::{Postprocessor, RunResult};
pub use scheduler::{Session, changed_areas};
