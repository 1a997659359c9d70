//! Mutable document tree and the HTML parse/serialize boundary.
//!
//! The pipeline crate operates exclusively on [`Document`], an arena tree
//! of elements and text nodes addressed by [`NodeId`]. Parsing raw markup
//! into a tree is abstracted behind the [`TreeParser`] trait so the
//! concrete HTML engine stays swappable; [`ScraperParser`] is the default
//! implementation, built on the `scraper` crate.

mod document;
mod parser;

pub use document::{Document, NodeId};
pub use parser::{ScraperParser, TreeParser};
