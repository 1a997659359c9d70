//! File-include processing for `data-include` annotated elements.
//!
//! File access goes through the injectable [`FileLoader`] trait so the
//! pipeline never touches the filesystem directly. A failed load degrades
//! to a warning plus a visible inline error marker; processing continues
//! with the other elements.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use specmill_dom::{Document, NodeId, TreeParser};
use specmill_shared::{Citation, ProcessingStats, Result, SpecmillError};

use crate::format::FormatRegistry;

/// Injectable file access used by the include processor.
#[async_trait]
pub trait FileLoader: Send + Sync {
    async fn load(&self, path: &str) -> Result<String>;
}

/// Loads files from the local filesystem.
pub struct FsLoader;

#[async_trait]
impl FileLoader for FsLoader {
    async fn load(&self, path: &str) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SpecmillError::io(path, e))
    }
}

/// Resolves and inlines `data-include` content.
pub struct IncludeProcessor {
    base_dir: Option<PathBuf>,
    loader: Arc<dyn FileLoader>,
}

impl IncludeProcessor {
    pub fn new(base_dir: Option<PathBuf>, loader: Arc<dyn FileLoader>) -> Self {
        Self { base_dir, loader }
    }

    /// Process every `data-include` element in the tree.
    ///
    /// Loaded content is converted through the format registry (the
    /// `data-include-format` attribute, default `text`) and replaces the
    /// element's children. An unregistered format propagates as a
    /// configuration error.
    pub async fn process_tree(
        &self,
        doc: &mut Document,
        formats: &FormatRegistry,
        parser: &dyn TreeParser,
        stats: &mut ProcessingStats,
        warnings: &mut Vec<String>,
        citations: &mut Vec<Citation>,
    ) -> Result<()> {
        let targets: Vec<NodeId> = doc
            .elements()
            .into_iter()
            .filter(|&el| doc.attr(el, "data-include").is_some())
            .collect();

        for element in targets {
            let path = doc
                .attr(element, "data-include")
                .unwrap_or_default()
                .to_string();
            let format = doc
                .attr(element, "data-include-format")
                .unwrap_or("text")
                .to_string();
            doc.remove_attr(element, "data-include");
            doc.remove_attr(element, "data-include-format");

            if path.trim().is_empty() {
                warnings.push("data-include attribute is empty".to_string());
                continue;
            }

            let resolved = self.resolve(&path);
            match self.loader.load(&resolved).await {
                Ok(content) => {
                    let converted = formats.convert(&content, &format)?;
                    stats.files_included += 1;
                    if format == "markdown" {
                        stats.markdown_blocks += 1;
                    }
                    citations.extend(converted.citations);

                    let fragment = parser.parse(&converted.html);
                    doc.clear_children(element);
                    doc.import_fragment(element, &fragment);
                    debug!(path = %path, format = %format, "include inlined");
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "include failed");
                    warnings.push(format!("Failed to load: {path}"));
                    let marker = doc.create_element("span");
                    doc.set_attr(marker, "class", "include-error");
                    let text = doc.create_text(&format!("Failed to load: {path}"));
                    doc.append_child(marker, text);
                    doc.append_child(element, marker);
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, path: &str) -> String {
        match &self.base_dir {
            Some(base) => base.join(path).to_string_lossy().into_owned(),
            None => path.to_string(),
        }
    }
}
