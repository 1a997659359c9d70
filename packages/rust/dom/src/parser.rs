//! The swappable markup-parsing boundary.
//!
//! The pipeline never parses raw markup itself; it receives a [`Document`]
//! from a [`TreeParser`] and hands one back for serialization. The default
//! implementation converts `scraper`'s parsed tree into the arena form.

use scraper::Html;

use crate::document::{Document, NodeId};

/// Boundary between raw markup and the mutable tree the pipeline works on.
pub trait TreeParser: Send + Sync {
    /// Parse a markup fragment into a document tree.
    fn parse(&self, markup: &str) -> Document;

    /// Serialize a document tree back to markup.
    fn serialize(&self, doc: &Document) -> String {
        doc.to_html()
    }
}

/// Default [`TreeParser`] built on the `scraper` HTML engine.
///
/// Wrapper elements synthesized by the HTML5 fragment algorithm (`html`,
/// `body`) are unwrapped transparently so the resulting tree mirrors the
/// authored fragment; `head` content is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScraperParser;

impl TreeParser for ScraperParser {
    fn parse(&self, markup: &str) -> Document {
        let parsed = Html::parse_fragment(markup);
        let mut doc = Document::new();
        let root = doc.root();
        convert_children(parsed.tree.root(), &mut doc, root);
        doc
    }
}

fn convert_children(
    src: ego_tree::NodeRef<'_, scraper::Node>,
    doc: &mut Document,
    parent: NodeId,
) {
    for child in src.children() {
        match child.value() {
            scraper::Node::Element(el) => match el.name() {
                // Synthetic wrappers from the fragment algorithm.
                "html" | "body" => convert_children(child, doc, parent),
                "head" => {}
                tag => {
                    let node = doc.create_element(tag);
                    for (name, value) in el.attrs() {
                        doc.set_attr(node, name, value);
                    }
                    doc.append_child(parent, node);
                    convert_children(child, doc, node);
                }
            },
            scraper::Node::Text(text) => {
                let node = doc.create_text(&text);
                doc.append_child(parent, node);
            }
            // Comments, doctypes and processing instructions carry no
            // semantics for the pipeline.
            _ => {}
        }
    }
}
