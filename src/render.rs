//! Render Root
//!
//! The live tree of one component instance plus the side tables the runtime
//! keeps about it:
//!
//! - `clones`: loop template → the clones it currently has in the tree
//! - `scopes`: clone root → the loop variable binding for that iteration
//! - `listeners` / `wired`: event listeners and which nodes already have them
//! - `captures`: handler arguments captured when a loop clone was made
//!
//! All tables are keyed by [`NodeId`] and pruned whenever a subtree is removed.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::dom::{Document, NodeId};
use crate::expression::{CallExpr, PropertyPath, Scope};
use crate::model::Model;

/// One iteration's binding of the loop variable
#[derive(Debug, Clone, PartialEq)]
pub struct LoopFrame {
    pub item: String,
    pub value: Value,
    pub index: usize,
    /// Where `value` was read from, as written in the `*for` expression
    pub collection: PropertyPath,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Listener {
    /// `data-<event>="method(args)"`
    Call { event: String, call: CallExpr },
    /// `data-value="path"` two-way binding
    Value { property: PropertyPath },
}

#[derive(Debug, Default)]
pub struct RenderRoot {
    pub(crate) doc: Document,
    clones: HashMap<NodeId, Vec<NodeId>>,
    scopes: HashMap<NodeId, LoopFrame>,
    listeners: HashMap<NodeId, Vec<Listener>>,
    wired: HashSet<NodeId>,
    captures: HashMap<(NodeId, String), Vec<Option<Value>>>,
}

impl RenderRoot {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            ..Default::default()
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Remove a subtree and forget everything recorded about it
    pub fn remove_node(&mut self, id: NodeId) {
        self.remove_nodes(&[id]);
    }

    /// Remove several subtrees, pruning each side table once
    pub fn remove_nodes(&mut self, ids: &[NodeId]) {
        let freed: HashSet<NodeId> = self.doc.remove_all(ids).into_iter().collect();
        if freed.is_empty() {
            return;
        }
        self.clones.retain(|template, _| !freed.contains(template));
        self.scopes.retain(|node, _| !freed.contains(node));
        self.listeners.retain(|node, _| !freed.contains(node));
        self.wired.retain(|node| !freed.contains(node));
        self.captures.retain(|(node, _), _| !freed.contains(node));
    }

    // ─── loops ────────────────────────────────────────────────────────────────

    pub fn is_loop_template(&self, id: NodeId) -> bool {
        self.doc
            .markers(id)
            .map(|m| m.repeat.is_some())
            .unwrap_or(false)
    }

    pub fn clones_of(&self, template: NodeId) -> &[NodeId] {
        self.clones
            .get(&template)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn take_clones(&mut self, template: NodeId) -> Vec<NodeId> {
        self.clones.remove(&template).unwrap_or_default()
    }

    pub(crate) fn set_clones(&mut self, template: NodeId, clones: Vec<NodeId>) {
        self.clones.insert(template, clones);
    }

    pub(crate) fn set_scope(&mut self, clone: NodeId, frame: LoopFrame) {
        self.scopes.insert(clone, frame);
    }

    pub fn scope_of(&self, clone: NodeId) -> Option<&LoopFrame> {
        self.scopes.get(&clone)
    }

    /// Loop frames visible from `id`, innermost first
    pub fn frames_for(&self, id: NodeId) -> Vec<LoopFrame> {
        std::iter::once(id)
            .chain(self.doc.ancestors(id))
            .filter_map(|node| self.scopes.get(&node).cloned())
            .collect()
    }

    /// Rendered nodes under `start` in document order. Loop templates and
    /// their contents are not rendered and are skipped.
    pub fn live_nodes(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if self.is_loop_template(current) {
                continue;
            }
            out.push(current);
            for &child in self.doc.children(current).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Loop templates owned directly by `start`: nested templates inside a
    /// clone belong to that clone and are reached when it is materialized.
    pub fn loop_templates(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if self.is_loop_template(current) {
                out.push(current);
                continue;
            }
            if current != start && self.scopes.contains_key(&current) {
                continue;
            }
            for &child in self.doc.children(current).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    // ─── listeners ────────────────────────────────────────────────────────────

    pub fn is_wired(&self, id: NodeId) -> bool {
        self.wired.contains(&id)
    }

    pub(crate) fn add_listeners(&mut self, id: NodeId, listeners: Vec<Listener>) {
        self.wired.insert(id);
        self.listeners.entry(id).or_default().extend(listeners);
    }

    pub fn listeners(&self, id: NodeId) -> &[Listener] {
        self.listeners
            .get(&id)
            .map(|l| l.as_slice())
            .unwrap_or(&[])
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub(crate) fn set_captures(&mut self, id: NodeId, event: &str, values: Vec<Option<Value>>) {
        self.captures.insert((id, event.to_string()), values);
    }

    pub fn captures(&self, id: NodeId, event: &str) -> Option<&[Option<Value>]> {
        self.captures
            .get(&(id, event.to_string()))
            .map(|c| c.as_slice())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NODE SCOPE
// ═══════════════════════════════════════════════════════════════════════════════

/// Expression scope for one node: loop variables innermost first, then the
/// state bag, then instance properties.
pub struct NodeScope<'a> {
    model: &'a mut Model,
    frames: Vec<LoopFrame>,
}

impl<'a> NodeScope<'a> {
    pub fn new(model: &'a mut Model, frames: Vec<LoopFrame>) -> Self {
        Self { model, frames }
    }
}

impl Scope for NodeScope<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(frame) = self.frames.iter().find(|f| f.item == name) {
            return Some(frame.value.clone());
        }
        if name == "$index" {
            return self.frames.first().map(|f| Value::from(f.index));
        }
        self.model.get(name)
    }

    fn call(&mut self, method: &str) -> Option<Value> {
        self.model.invoke_from_template(method, &[])
    }
}
