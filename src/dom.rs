//! Arena-backed element tree standing in for the storefront page.
//!
//! The tree is append-only: widgets toggle classes, attributes and text but
//! never detach nodes, so nodes live in a [`Slab`] and `NodeId`s stay valid
//! for the lifetime of the document. All queries walk the tree in document
//! order (depth-first, children in insertion order), which keeps things like
//! "the first quantity input inside the card" deterministic.

use std::collections::{BTreeMap, BTreeSet};

use slab::Slab;
use url::Url;

use crate::selector::Selector;

/// Handle to one element of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Default)]
struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attrs: BTreeMap<String, String>,
    classes: BTreeSet<String>,
    text: String,
}

/// One page: an element tree plus the current location URL.
#[derive(Debug)]
pub struct Document {
    nodes: Slab<Node>,
    root: NodeId,
    location: Url,
}

impl Document {
    /// Creates a document with a single `body` root at `location`.
    pub fn new(location: Url) -> Self {
        let mut nodes = Slab::new();
        let root = NodeId(nodes.insert(Node {
            tag: "body".to_string(),
            ..Node::default()
        }));
        Self {
            nodes,
            root,
            location,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn set_location(&mut self, location: Url) {
        self.location = location;
    }

    /// Appends a new element under `parent` and returns its id.
    pub fn create_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.insert(Node {
            tag: tag.to_string(),
            parent: Some(parent),
            ..Node::default()
        }));
        self.node_mut(parent).children.push(id);
        id
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.node(node).tag
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.node(node).children
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node).attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        self.node_mut(node)
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        self.node_mut(node).attrs.remove(name);
    }

    /// Shorthand for `attr("data-<key>")`, mirroring dataset access.
    pub fn data(&self, node: NodeId, key: &str) -> Option<&str> {
        let name = format!("data-{key}");
        self.node(node).attrs.get(&name).map(String::as_str)
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.node(node).classes.contains(class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        self.node_mut(node).classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        self.node_mut(node).classes.remove(class);
    }

    /// Adds or removes `class` depending on `on`.
    pub fn toggle_class(&mut self, node: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    /// Class names of `node`, in sorted order.
    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.node(node).classes.iter().map(String::as_str)
    }

    pub fn text(&self, node: NodeId) -> &str {
        &self.node(node).text
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.node_mut(node).text = text.to_string();
    }

    pub fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// Nearest self-or-ancestor matching `selector`.
    pub fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if self.matches(candidate, selector) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// True when `node` is `ancestor` or lies somewhere below it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.parent(candidate);
        }
        false
    }

    /// First match for `selector` anywhere in the document.
    pub fn query(&self, selector: &Selector) -> Option<NodeId> {
        self.query_all(selector).into_iter().next()
    }

    /// All matches for `selector` in document order.
    pub fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(self.root, &mut |node| {
            if self.matches(node, selector) {
                out.push(node);
            }
        });
        out
    }

    /// Matches among the strict descendants of `scope`, in document order.
    /// The scope element itself is never returned.
    pub fn query_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &child in self.children(scope) {
            self.walk(child, &mut |node| {
                if self.matches(node, selector) {
                    out.push(node);
                }
            });
        }
        out
    }

    fn walk(&self, from: NodeId, visit: &mut impl FnMut(NodeId)) {
        visit(from);
        for &child in self.children(from) {
            self.walk(child, visit);
        }
    }

    fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node.0]
    }

    fn node_mut(&mut self, node: NodeId) -> &mut Node {
        &mut self.nodes[node.0]
    }
}
