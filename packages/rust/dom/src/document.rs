//! Arena-based mutable document tree.
//!
//! Nodes live in a flat `Vec` and reference each other through [`NodeId`]
//! indices, so passes can hold ids across mutations without fighting the
//! borrow checker. Ids are never reused within one document's lifetime;
//! detached nodes simply become unreachable.

use std::collections::HashSet;
use std::fmt::Write as _;

/// Index of a node inside its owning [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Elements that serialize without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A mutable tree of elements and text nodes.
///
/// The root is a synthetic fragment container: serialization emits only
/// its children, so a `Document` can represent any markup fragment.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a fragment root.
    pub fn new() -> Self {
        let root_node = Node {
            parent: None,
            children: Vec::new(),
            data: NodeData::Element {
                tag: "#fragment".into(),
                attrs: Vec::new(),
            },
        };
        Self {
            nodes: vec![root_node],
            root: NodeId(0),
        }
    }

    /// The synthetic fragment root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    // -----------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------

    /// Create a detached element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeData::Text(text.to_string()))
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `new` as a sibling immediately before `reference`. Falls back
    /// to appending at the root when `reference` has no parent.
    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) {
        self.detach(new);
        match self.nodes[reference.0].parent {
            Some(parent) => {
                let pos = self.nodes[parent.0]
                    .children
                    .iter()
                    .position(|&c| c == reference)
                    .unwrap_or(self.nodes[parent.0].children.len());
                self.nodes[new.0].parent = Some(parent);
                self.nodes[parent.0].children.insert(pos, new);
            }
            None => self.append_child(self.root, new),
        }
    }

    /// Remove a node from its parent's child list. The node stays in the
    /// arena and can be reinserted later.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    /// Remove all children of `node`.
    pub fn clear_children(&mut self, node: NodeId) {
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Deep-copy the children of `other`'s root under `parent`.
    pub fn import_fragment(&mut self, parent: NodeId, other: &Document) {
        for child in other.children(other.root()).to_vec() {
            let copied = self.import_node(other, child);
            self.append_child(parent, copied);
        }
    }

    fn import_node(&mut self, other: &Document, node: NodeId) -> NodeId {
        let copied = match &other.nodes[node.0].data {
            NodeData::Element { tag, attrs } => {
                let el = self.create_element(tag);
                if let NodeData::Element { attrs: dst, .. } = &mut self.nodes[el.0].data {
                    *dst = attrs.clone();
                }
                el
            }
            NodeData::Text(text) => self.create_text(text),
        };
        for child in other.children(node).to_vec() {
            let c = self.import_node(other, child);
            self.append_child(copied, c);
        }
        copied
    }

    // -----------------------------------------------------------------
    // Structure accessors
    // -----------------------------------------------------------------

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// The sibling immediately after `node`, if any.
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == node)?;
        siblings.get(pos + 1).copied()
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].data, NodeData::Element { .. })
    }

    /// Tag name of an element node, `None` for text nodes.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    /// Raw content of a text node, `None` for elements.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    // -----------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data {
            attrs.retain(|(n, _)| n != name);
        }
    }

    /// Whether an element's `class` attribute contains `class_name` as a
    /// whitespace-separated token.
    pub fn has_class(&self, node: NodeId, class_name: &str) -> bool {
        self.attr(node, "class")
            .map(|classes| classes.split_ascii_whitespace().any(|c| c == class_name))
            .unwrap_or(false)
    }

    // -----------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------

    /// All descendants of `node` in pre-order (document order), excluding
    /// `node` itself. Snapshot semantics: mutations after the call do not
    /// affect the returned list.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(node, &mut out);
        out
    }

    fn collect_descendants(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.nodes[node.0].children {
            out.push(child);
            self.collect_descendants(child, out);
        }
    }

    /// All element descendants of the root, in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&n| self.is_element(n))
            .collect()
    }

    /// Element descendants of the root whose tag matches one of `tags`.
    pub fn elements_with_tag(&self, tags: &[&str]) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|&n| self.tag(n).is_some_and(|t| tags.contains(&t)))
            .collect()
    }

    /// Walk from `node` up through its ancestors (inclusive) and return the
    /// first one matching the predicate.
    pub fn closest(&self, node: NodeId, pred: impl Fn(&Document, NodeId) -> bool) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.is_element(n) && pred(self, n) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    /// Whether `node` sits inside (or is) an element carrying the given
    /// class — the standard warning-suppression check.
    pub fn in_class_scope(&self, node: NodeId, class_name: &str) -> bool {
        self.closest(node, |doc, n| doc.has_class(n, class_name))
            .is_some()
    }

    /// Concatenated text of `node` and all its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element { .. } => {
                for &child in &self.nodes[node.0].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Id lookup
    // -----------------------------------------------------------------

    /// Document-wide lookup of an element by its `id` attribute. Returns
    /// the first match in document order.
    pub fn element_by_id(&self, id_value: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|&n| self.attr(n, "id") == Some(id_value))
    }

    /// Produce an id that does not collide with any existing element id:
    /// `base`, then `base-2`, `base-3`, …
    pub fn unique_id(&self, base: &str) -> String {
        let taken: HashSet<&str> = self
            .elements()
            .into_iter()
            .filter_map(|n| self.attr(n, "id"))
            .collect();
        if !taken.contains(base) {
            return base.to_string();
        }
        let mut i = 2;
        loop {
            let candidate = format!("{base}-{i}");
            if !taken.contains(candidate.as_str()) {
                return candidate;
            }
            i += 1;
        }
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize the whole fragment (children of the root).
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.root) {
            self.write_node(child, &mut out);
        }
        out
    }

    /// Serialize a single node, including its own tags.
    pub fn node_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element { tag, attrs } => {
                if tag == "#fragment" {
                    for &child in &self.nodes[node.0].children {
                        self.write_node(child, out);
                    }
                    return;
                }
                let _ = write!(out, "<{tag}");
                for (name, value) in attrs {
                    if value.is_empty() {
                        let _ = write!(out, " {name}");
                    } else {
                        let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for &child in &self.nodes[node.0].children {
                    self.write_node(child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
