//! In-memory DOM
//!
//! Nodes live in a slotmap arena so the runtime can keep side tables keyed by
//! [`NodeId`] (listener registrations, loop clones, loop scopes) without
//! writing bookkeeping attributes into the tree. Removed nodes invalidate their
//! keys, so stale side-table entries are detectable with [`Document::contains`].
//!
//! Binding markers produced by the compiler are typed per-node metadata
//! ([`Markers`]) and travel with a node when it is deep-cloned.

use slotmap::{new_key_type, SlotMap};
use std::collections::HashSet;

use crate::expression::{Expr, PropertyPath, Segment};

new_key_type! {
    pub struct NodeId;
}

/// Elements whose serialization has no closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text children are serialized verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &["style", "script"];

/// Elements with a live `value` property that can diverge from the attribute
const VALUE_ELEMENTS: &[&str] = &["input", "textarea", "select", "option", "button"];

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING MARKERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Binding metadata attached to a node by the template compiler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Markers {
    /// Expression rendered as this node's text (`fn()` makes it a function binding)
    pub text: Option<Expr>,
    /// Attributes re-rendered from their raw `{{ }}` template on every sync
    pub attributes: Vec<AttributeBinding>,
    /// `*if` condition
    pub condition: Option<Expr>,
    /// `*for` directive; only loop templates carry it
    pub repeat: Option<LoopDirective>,
    /// Event names rewritten from `(event)` shorthand to `data-event`
    pub events: Vec<String>,
}

impl Markers {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.attributes.is_empty()
            && self.condition.is_none()
            && self.repeat.is_none()
            && self.events.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBinding {
    pub name: String,
    /// Raw attribute text as written, e.g. `item {{ state }}`
    pub template: String,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoopDirective {
    /// `[let] item of collection.path`
    Each {
        item: String,
        collection: PropertyPath,
    },
    /// Malformed expression; never materializes
    Inert(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// Live value property; `None` until something writes it
    pub value: Option<String>,
    /// Display suppressed (`*if` false or loop template)
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Fragment,
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    markers: Markers,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            markers: Markers::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOCUMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// A tree rooted at a fragment node
#[derive(Debug, Clone)]
pub struct Document {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Fragment));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // ─── construction ─────────────────────────────────────────────────────────

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Element(Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
            value: None,
            hidden: false,
        })))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Text(text.to_string())))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.nodes.insert(Node::new(NodeKind::Comment(text.to_string())))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` under `parent` before `reference` (or last when `None`
    /// or when `reference` is not a child of `parent`).
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if !self.contains(parent) || !self.contains(child) || parent == child {
            return;
        }
        self.detach(child);

        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return;
        };
        let position = reference
            .and_then(|r| parent_node.children.iter().position(|&c| c == r))
            .unwrap_or(parent_node.children.len());
        parent_node.children.insert(position, child);

        if let Some(child_node) = self.nodes.get_mut(child) {
            child_node.parent = Some(parent);
        }
    }

    /// Unlink a node from its parent, keeping its subtree alive
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(id).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|&c| c != id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    /// Insert several detached nodes under `parent` before `reference`, in
    /// order, with a single splice
    pub fn insert_all_before(&mut self, parent: NodeId, children: &[NodeId], reference: Option<NodeId>) {
        if !self.contains(parent) {
            return;
        }
        let children: Vec<NodeId> = children
            .iter()
            .copied()
            .filter(|&c| c != parent && self.contains(c))
            .collect();
        for &child in &children {
            self.detach(child);
        }

        let Some(parent_node) = self.nodes.get_mut(parent) else {
            return;
        };
        let position = reference
            .and_then(|r| parent_node.children.iter().position(|&c| c == r))
            .unwrap_or(parent_node.children.len());
        parent_node
            .children
            .splice(position..position, children.iter().copied());

        for child in children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = Some(parent);
            }
        }
    }

    /// Detach a node and free it together with all of its descendants.
    /// Returns every freed id so side tables can be pruned.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        self.remove_all(&[id])
    }

    /// Free several subtrees at once. Each parent's child list is filtered a
    /// single time however many of its children go.
    pub fn remove_all(&mut self, ids: &[NodeId]) -> Vec<NodeId> {
        let targets: HashSet<NodeId> = ids
            .iter()
            .copied()
            .filter(|&id| id != self.root && self.contains(id))
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }

        let parents: HashSet<NodeId> = targets.iter().filter_map(|&id| self.parent(id)).collect();
        for parent in parents {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.children.retain(|c| !targets.contains(c));
            }
        }

        let mut freed = Vec::new();
        for &id in ids {
            if !targets.contains(&id) || !self.contains(id) {
                continue;
            }
            let subtree = self.subtree(id);
            for &node in &subtree {
                self.nodes.remove(node);
            }
            freed.extend(subtree);
        }
        freed
    }

    /// Copy a node and its descendants, markers included. The copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(id)?;
        let mut copy = Node::new(node.kind.clone());
        copy.markers = node.markers.clone();
        let children = node.children.clone();

        let copy_id = self.nodes.insert(copy);
        for child in children {
            if let Some(child_copy) = self.deep_clone(child) {
                self.append_child(copy_id, child_copy);
            }
        }
        Some(copy_id)
    }

    // ─── navigation ───────────────────────────────────────────────────────────

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Parent chain, nearest first, excluding `id` itself
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            chain.push(p);
            current = self.parent(p);
        }
        chain
    }

    /// `id` and all of its descendants in document order
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Every node under the root in document order
    pub fn all(&self) -> Vec<NodeId> {
        self.subtree(self.root)
    }

    /// Elements (under the root) matching a predicate, in document order
    pub fn query_all(&self, mut predicate: impl FnMut(&Element) -> bool) -> Vec<NodeId> {
        self.all()
            .into_iter()
            .filter(|&id| self.element(id).map(&mut predicate).unwrap_or(false))
            .collect()
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.query_all(|el| el.tag.eq_ignore_ascii_case(tag))
    }

    pub fn find_by_attribute(&self, name: &str, value: &str) -> Vec<NodeId> {
        self.query_all(|el| el.attrs.iter().any(|(n, v)| n == name && v == value))
    }

    // ─── node data ────────────────────────────────────────────────────────────

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(|n| &n.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn markers(&self, id: NodeId) -> Option<&Markers> {
        self.nodes.get(id).map(|n| &n.markers)
    }

    pub fn markers_mut(&mut self, id: NodeId) -> Option<&mut Markers> {
        self.nodes.get_mut(id).map(|n| &mut n.markers)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        match el.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => el.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let el = self.element_mut(id)?;
        let position = el.attrs.iter().position(|(n, _)| n == name)?;
        Some(el.attrs.remove(position).1)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.subtree(id)
            .into_iter()
            .filter_map(|n| match self.kind(n) {
                Some(NodeKind::Text(t)) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replace text. On an element this drops all children and leaves a
    /// single text node, like assigning `textContent`.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        let is_container = match self.kind(id) {
            Some(NodeKind::Element(_)) | Some(NodeKind::Fragment) => true,
            Some(_) => false,
            None => return,
        };

        if is_container {
            for child in self.children(id).to_vec() {
                self.remove(child);
            }
            if !text.is_empty() {
                let node = self.create_text(text);
                self.append_child(id, node);
            }
        } else if let Some(node) = self.nodes.get_mut(id) {
            if let NodeKind::Text(existing) | NodeKind::Comment(existing) = &mut node.kind {
                *existing = text.to_string();
            }
        }
    }

    pub fn supports_value(&self, id: NodeId) -> bool {
        self.tag(id)
            .map(|t| VALUE_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(t)))
            .unwrap_or(false)
    }

    /// Live value, falling back to the `value` attribute
    pub fn value(&self, id: NodeId) -> Option<String> {
        let el = self.element(id)?;
        el.value
            .clone()
            .or_else(|| self.attribute(id, "value").map(str::to_string))
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.value = Some(value.to_string());
        }
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        if let Some(el) = self.element_mut(id) {
            el.hidden = hidden;
        }
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.element(id).map(|el| el.hidden).unwrap_or(false)
    }

    /// Visible iff neither the node nor any ancestor is hidden
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.contains(id)
            && !self.is_hidden(id)
            && self.ancestors(id).into_iter().all(|a| !self.is_hidden(a))
    }

    // ─── serialization ────────────────────────────────────────────────────────

    /// Serialize the children of `id`
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_node(child, &mut out, false);
        }
        out
    }

    /// Serialize `id` itself
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out, false);
        out
    }

    pub fn to_html(&self) -> String {
        self.inner_html(self.root)
    }

    fn write_node(&self, id: NodeId, out: &mut String, raw_text: bool) {
        match self.kind(id) {
            Some(NodeKind::Fragment) => {
                for &child in self.children(id) {
                    self.write_node(child, out, raw_text);
                }
            }
            Some(NodeKind::Text(text)) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    out.push_str(&html_escape::encode_text(text));
                }
            }
            Some(NodeKind::Comment(text)) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            Some(NodeKind::Element(el)) => {
                out.push('<');
                out.push_str(&el.tag);
                let mut wrote_style = false;
                for (name, value) in &el.attrs {
                    let value = if name == "style" && el.hidden {
                        wrote_style = true;
                        format!("display: none; {}", value)
                    } else {
                        value.clone()
                    };
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(&value));
                    out.push('"');
                }
                if el.hidden && !wrote_style {
                    out.push_str(" style=\"display: none\"");
                }
                out.push('>');

                let tag = el.tag.to_ascii_lowercase();
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&tag.as_str());
                for &child in self.children(id) {
                    self.write_node(child, out, raw);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
            None => {}
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_doc() -> (Document, NodeId) {
        let mut doc = Document::new();
        let ul = doc.create_element("ul");
        doc.append_child(doc.root(), ul);
        for label in ["a", "b"] {
            let li = doc.create_element("li");
            doc.set_text_content(li, label);
            doc.append_child(ul, li);
        }
        (doc, ul)
    }

    #[test]
    fn test_insert_before_and_serialize() {
        let (mut doc, ul) = list_doc();
        let first = doc.children(ul)[0];
        let li = doc.create_element("li");
        doc.set_text_content(li, "z");
        doc.insert_before(ul, li, Some(first));
        assert_eq!(doc.to_html(), "<ul><li>z</li><li>a</li><li>b</li></ul>");
    }

    #[test]
    fn test_remove_frees_subtree() {
        let (mut doc, ul) = list_doc();
        let before = doc.len();
        let freed = doc.remove(ul);
        assert_eq!(freed.len(), 5);
        assert_eq!(doc.len(), before - 5);
        assert!(!doc.contains(ul));
        assert_eq!(doc.to_html(), "");
    }

    #[test]
    fn test_insert_all_before_keeps_order() {
        let (mut doc, ul) = list_doc();
        let last = doc.children(ul)[1];
        let fresh: Vec<NodeId> = ["x", "y", "z"]
            .iter()
            .map(|label| {
                let li = doc.create_element("li");
                doc.set_text_content(li, label);
                li
            })
            .collect();
        doc.insert_all_before(ul, &fresh, Some(last));
        assert_eq!(
            doc.to_html(),
            "<ul><li>a</li><li>x</li><li>y</li><li>z</li><li>b</li></ul>"
        );
        assert!(fresh.iter().all(|&li| doc.parent(li) == Some(ul)));
    }

    #[test]
    fn test_remove_all_frees_each_subtree_once() {
        let (mut doc, ul) = list_doc();
        let items = doc.children(ul).to_vec();
        let text = doc.children(items[0])[0];
        let root = doc.root();
        let before = doc.len();

        let freed = doc.remove_all(&[text, items[0], items[1], root]);
        assert_eq!(freed.len(), 4);
        assert_eq!(doc.len(), before - 4);
        assert!(doc.children(ul).is_empty());
        assert_eq!(doc.to_html(), "<ul></ul>");
    }

    #[test]
    fn test_deep_clone_copies_markers() {
        let (mut doc, ul) = list_doc();
        doc.markers_mut(ul).unwrap().condition = Some(Expr::parse("flag"));
        let copy = doc.deep_clone(ul).unwrap();
        assert_ne!(copy, ul);
        assert!(doc.parent(copy).is_none());
        assert_eq!(doc.markers(copy).unwrap().condition, Some(Expr::parse("flag")));
        assert_eq!(doc.text_content(copy), "ab");
    }

    #[test]
    fn test_hidden_is_serialized_and_inherited() {
        let (mut doc, ul) = list_doc();
        let li = doc.children(ul)[0];
        doc.set_hidden(ul, true);
        assert!(!doc.is_visible(li));
        assert!(doc.to_html().starts_with("<ul style=\"display: none\">"));
        doc.set_hidden(ul, false);
        assert!(doc.is_visible(li));
    }

    #[test]
    fn test_attributes_and_value() {
        let mut doc = Document::new();
        let input = doc.create_element("input");
        doc.append_child(doc.root(), input);
        doc.set_attribute(input, "value", "Bob");
        assert_eq!(doc.value(input).as_deref(), Some("Bob"));
        doc.set_value(input, "Zed");
        assert_eq!(doc.value(input).as_deref(), Some("Zed"));
        assert_eq!(doc.attribute(input, "value"), Some("Bob"));
        assert!(doc.supports_value(input));
        assert_eq!(doc.to_html(), "<input value=\"Bob\">");
    }

    #[test]
    fn test_text_escaping() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.append_child(doc.root(), p);
        doc.set_text_content(p, "a < b & c");
        assert_eq!(doc.to_html(), "<p>a &lt; b &amp; c</p>");
    }
}
