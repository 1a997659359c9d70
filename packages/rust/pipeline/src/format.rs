//! Content-format strategies for included and inline-annotated content.
//!
//! A strategy converts raw content to HTML. The registry ships with
//! `markdown`, `text` and `html` built in and accepts caller extensions.
//! Requesting an unregistered format is the one fatal error in the
//! system: it indicates a misconfigured caller, not bad input content,
//! so it raises immediately instead of degrading to a warning.

use std::collections::BTreeMap;

use specmill_markdown::MarkdownOptions;
use specmill_shared::{Citation, Result, SpecmillError};

/// Converted content plus any citations the conversion surfaced.
#[derive(Debug, Clone, Default)]
pub struct FormatOutput {
    pub html: String,
    pub citations: Vec<Citation>,
}

/// Strategy for converting content of one named format.
pub trait FormatStrategy: Send + Sync {
    fn convert(&self, content: &str) -> FormatOutput;
}

/// Markdown → HTML via the markdown collaborator.
pub struct MarkdownStrategy {
    options: MarkdownOptions,
}

impl MarkdownStrategy {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }
}

impl FormatStrategy for MarkdownStrategy {
    fn convert(&self, content: &str) -> FormatOutput {
        let rendered = specmill_markdown::render(content, &self.options);
        FormatOutput {
            html: rendered.html,
            citations: rendered.citations,
        }
    }
}

/// Returns content unchanged (used for `text` and `html`).
pub struct PassthroughStrategy;

impl FormatStrategy for PassthroughStrategy {
    fn convert(&self, content: &str) -> FormatOutput {
        FormatOutput {
            html: content.to_string(),
            citations: Vec::new(),
        }
    }
}

/// Strategies keyed by format name.
pub struct FormatRegistry {
    strategies: BTreeMap<String, Box<dyn FormatStrategy>>,
}

impl FormatRegistry {
    /// Registry with the built-in formats.
    pub fn standard(markdown: MarkdownOptions) -> Self {
        let mut registry = Self {
            strategies: BTreeMap::new(),
        };
        registry.register("markdown", Box::new(MarkdownStrategy::new(markdown)));
        registry.register("text", Box::new(PassthroughStrategy));
        registry.register("html", Box::new(PassthroughStrategy));
        registry
    }

    /// Register (or replace) a strategy for a format name.
    pub fn register(&mut self, format: &str, strategy: Box<dyn FormatStrategy>) {
        self.strategies.insert(format.to_string(), strategy);
    }

    /// Convert content, failing fast on an unregistered format.
    pub fn convert(&self, content: &str, format: &str) -> Result<FormatOutput> {
        let strategy = self.strategies.get(format).ok_or_else(|| {
            SpecmillError::config(format!("unsupported content format: {format}"))
        })?;
        Ok(strategy.convert(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_strategy_converts() {
        let registry = FormatRegistry::standard(MarkdownOptions::default());
        let out = registry
            .convert("Some *emphasis* and [[!DOM]].", "markdown")
            .expect("markdown registered");
        assert!(out.html.contains("<em>emphasis</em>"));
        assert_eq!(out.citations.len(), 1);
    }

    #[test]
    fn text_and_html_pass_through() {
        let registry = FormatRegistry::standard(MarkdownOptions::default());
        let out = registry.convert("<p>as is</p>", "html").expect("registered");
        assert_eq!(out.html, "<p>as is</p>");
        let out = registry.convert("plain", "text").expect("registered");
        assert_eq!(out.html, "plain");
    }

    #[test]
    fn unknown_format_is_a_config_error() {
        let registry = FormatRegistry::standard(MarkdownOptions::default());
        let err = registry
            .convert("whatever", "asciidoc")
            .expect_err("unregistered format");
        assert!(matches!(err, SpecmillError::Config { .. }));
        assert!(err.to_string().contains("asciidoc"));
    }

    #[test]
    fn custom_strategies_can_be_registered() {
        struct Upper;
        impl FormatStrategy for Upper {
            fn convert(&self, content: &str) -> FormatOutput {
                FormatOutput {
                    html: content.to_uppercase(),
                    citations: Vec::new(),
                }
            }
        }

        let mut registry = FormatRegistry::standard(MarkdownOptions::default());
        registry.register("upper", Box::new(Upper));
        let out = registry.convert("abc", "upper").expect("registered");
        assert_eq!(out.html, "ABC");
    }
}
