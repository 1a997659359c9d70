//! Sequential pass execution with short-circuit and failure conversion.
//!
//! The runner is a plain ordered loop over pass values: each pass either
//! continues the chain, stops it, or fails. Failures inside one run are
//! not isolated from each other (nothing after a failed pass executes),
//! but they are isolated from the caller — a pass error becomes a single
//! synthetic warning and the outputs written so far are still returned.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use specmill_dom::Document;
use specmill_shared::OutputArea;

use crate::context::{AreaOutput, Pass, PassFlow, PipelineContext, RunOptions};
use crate::passes::{
    AssertionsPass, BoilerplatePass, DiagnosticsPass, IdlPass, ReferencesPass, TocPass, XrefPass,
};

/// Result of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    /// Typed outputs from the passes that executed.
    pub outputs: BTreeMap<OutputArea, AreaOutput>,
    /// Accumulated warnings from all executed passes.
    pub warnings: Vec<String>,
}

/// Orchestrates execution of post-processing passes.
pub struct Postprocessor {
    passes: Vec<Box<dyn Pass>>,
}

impl Postprocessor {
    pub fn new(passes: Vec<Box<dyn Pass>>) -> Self {
        Self { passes }
    }

    /// The production pass list, in the fixed topological order: the
    /// interface index and term resolution must finish before the
    /// bibliography and boilerplate mutate the tree, and the outline and
    /// diagnostics must observe the final anchor set.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(IdlPass),
            Box::new(XrefPass),
            Box::new(ReferencesPass),
            Box::new(BoilerplatePass),
            Box::new(TocPass),
            Box::new(DiagnosticsPass),
            Box::new(AssertionsPass),
        ])
    }

    /// Run the configured passes over the working tree.
    ///
    /// `areas` filters which passes execute; `None` runs all of them.
    #[instrument(skip_all, fields(passes = self.passes.len()))]
    pub async fn run(
        &self,
        doc: &mut Document,
        areas: Option<&BTreeSet<OutputArea>>,
        options: Arc<RunOptions>,
    ) -> RunResult {
        let mut ctx = PipelineContext::new(options);

        for pass in &self.passes {
            let area = pass.area();
            if let Some(selected) = areas {
                if !selected.contains(&area) {
                    continue;
                }
            }
            debug!(%area, "running pass");
            match pass.run(doc, &mut ctx).await {
                Ok(PassFlow::Continue) => {}
                Ok(PassFlow::Stop) => {
                    debug!(%area, "pass short-circuited the chain");
                    break;
                }
                Err(e) => {
                    ctx.warn(format!("Postprocess failed: {e}"));
                    break;
                }
            }
        }

        RunResult {
            outputs: ctx.outputs,
            warnings: ctx.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use specmill_shared::{Result, SpecmillError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPass {
        area: OutputArea,
        calls: Arc<AtomicUsize>,
        flow: PassFlow,
    }

    #[async_trait]
    impl Pass for CountingPass {
        fn area(&self) -> OutputArea {
            self.area
        }

        async fn run(&self, _doc: &mut Document, _ctx: &mut PipelineContext) -> Result<PassFlow> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.flow)
        }
    }

    struct FailingPass;

    #[async_trait]
    impl Pass for FailingPass {
        fn area(&self) -> OutputArea {
            OutputArea::Xref
        }

        async fn run(&self, _doc: &mut Document, ctx: &mut PipelineContext) -> Result<PassFlow> {
            ctx.outputs.insert(
                OutputArea::Xref,
                AreaOutput::References("partial".into()),
            );
            Err(SpecmillError::validation("boom"))
        }
    }

    fn counting(area: OutputArea, calls: &Arc<AtomicUsize>, flow: PassFlow) -> Box<dyn Pass> {
        Box::new(CountingPass {
            area,
            calls: calls.clone(),
            flow,
        })
    }

    #[tokio::test]
    async fn runs_passes_in_order_and_filters_by_area() {
        let idl_calls = Arc::new(AtomicUsize::new(0));
        let toc_calls = Arc::new(AtomicUsize::new(0));
        let runner = Postprocessor::new(vec![
            counting(OutputArea::Idl, &idl_calls, PassFlow::Continue),
            counting(OutputArea::Toc, &toc_calls, PassFlow::Continue),
        ]);

        let mut doc = Document::new();
        let areas: BTreeSet<OutputArea> = [OutputArea::Toc].into();
        runner
            .run(&mut doc, Some(&areas), Arc::new(RunOptions::default()))
            .await;

        assert_eq!(idl_calls.load(Ordering::SeqCst), 0);
        assert_eq!(toc_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_short_circuits_later_passes() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let runner = Postprocessor::new(vec![
            counting(OutputArea::Idl, &first, PassFlow::Stop),
            counting(OutputArea::Toc, &second, PassFlow::Continue),
        ]);

        let mut doc = Document::new();
        runner
            .run(&mut doc, None, Arc::new(RunOptions::default()))
            .await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pass_error_becomes_warning_and_preserves_outputs() {
        let later = Arc::new(AtomicUsize::new(0));
        let runner = Postprocessor::new(vec![
            Box::new(FailingPass),
            counting(OutputArea::Toc, &later, PassFlow::Continue),
        ]);

        let mut doc = Document::new();
        let result = runner
            .run(&mut doc, None, Arc::new(RunOptions::default()))
            .await;

        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].starts_with("Postprocess failed:"));
        // The failing pass's already-written output survives.
        assert!(result.outputs.contains_key(&OutputArea::Xref));
    }
}
