//! Binding Synchronizer
//!
//! Re-applies text, function and attribute bindings to the live tree. Every
//! pass recomputes from the model and only touches nodes whose output
//! changed, so running it repeatedly is harmless.

use crate::dom::NodeId;
use crate::expression::{render, PropertyPath, Segment};
use crate::model::Model;
use crate::render::{NodeScope, RenderRoot};
use crate::value::display;

/// Which bindings a pass re-applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPass {
    /// Everything
    All,
    /// Bindings that read state directly
    Values,
    /// Bindings that call a method (`fn()`)
    Functions,
}

impl SyncPass {
    fn includes(self, is_call: bool) -> bool {
        match self {
            SyncPass::All => true,
            SyncPass::Values => !is_call,
            SyncPass::Functions => is_call,
        }
    }
}

pub fn sync(root: &mut RenderRoot, model: &mut Model, pass: SyncPass) {
    let start = root.doc.root();
    sync_subtree(root, model, start, pass);
}

pub fn sync_function_bindings(root: &mut RenderRoot, model: &mut Model) {
    sync(root, model, SyncPass::Functions);
}

pub fn sync_subtree(root: &mut RenderRoot, model: &mut Model, start: NodeId, pass: SyncPass) {
    for id in root.live_nodes(start) {
        sync_node(root, model, id, pass);
    }
}

fn sync_node(root: &mut RenderRoot, model: &mut Model, id: NodeId, pass: SyncPass) {
    let Some(markers) = root.doc.markers(id) else {
        return;
    };
    let text = markers.text.clone();
    let attributes = markers.attributes.clone();
    let value_binding = root
        .doc
        .attribute(id, "data-value")
        .and_then(PropertyPath::parse);

    if text.is_none() && attributes.is_empty() && value_binding.is_none() {
        return;
    }

    let frames = root.frames_for(id);
    let mut scope = NodeScope::new(model, frames);

    if let Some(expr) = text {
        if pass.includes(expr.is_call()) {
            let rendered = display(expr.evaluate(&mut scope).as_ref());
            if root.doc.text_content(id) != rendered {
                root.doc.set_text_content(id, &rendered);
            }
        }
    }

    for binding in attributes {
        let is_call = binding.segments.iter().any(|s| match s {
            Segment::Binding(expr) => expr.is_call(),
            Segment::Literal(_) => false,
        });
        if !pass.includes(is_call) {
            continue;
        }

        let rendered = render(&binding.segments, &mut scope);
        if root.doc.attribute(id, &binding.name) != Some(rendered.as_str()) {
            root.doc.set_attribute(id, &binding.name, &rendered);
        }
        if binding.name == "value" && root.doc.supports_value(id) {
            root.doc.set_value(id, &rendered);
        }
    }

    if let Some(path) = value_binding {
        if pass.includes(false) {
            if let Some(current) = path.resolve(&scope) {
                let rendered = display(Some(&current));
                if root.doc.value(id).as_deref() != Some(rendered.as_str()) {
                    root.doc.set_value(id, &rendered);
                }
            }
        }
    }
}
