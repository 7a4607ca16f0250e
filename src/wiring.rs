//! Interaction Wiring
//!
//! Turns `data-<event>` attributes into listener registrations in the render
//! root's side table. A node is wired at most once; loop clones are new nodes
//! and therefore start unwired.

use crate::dom::{Document, NodeId};
use crate::expression::{CallExpr, PropertyPath};
use crate::model::Model;
use crate::render::{Listener, NodeScope, RenderRoot};
use crate::value::display;

/// DOM events that write a `data-value` control back into state
pub const VALUE_EVENTS: &[&str] = &["input", "change", "keyup"];

pub fn wire(root: &mut RenderRoot, model: &mut Model) {
    let start = root.doc.root();
    for id in root.live_nodes(start) {
        if root.is_wired(id) {
            continue;
        }
        let listeners = listeners_for(&root.doc, id);
        if listeners.is_empty() {
            continue;
        }

        for listener in &listeners {
            if let Listener::Value { property } = listener {
                let frames = root.frames_for(id);
                let current = property.resolve(&NodeScope::new(model, frames));
                if let Some(value) = current {
                    root.doc.set_value(id, &display(Some(&value)));
                }
            }
        }

        tracing::trace!("Wired {} listener(s) on <{}>", listeners.len(), root.doc.tag(id).unwrap_or("?"));
        root.add_listeners(id, listeners);
    }
}

/// Listeners declared on one element
pub fn listeners_for(doc: &Document, id: NodeId) -> Vec<Listener> {
    let Some(markers) = doc.markers(id) else {
        return Vec::new();
    };

    let mut events = markers.events.clone();
    for implicit in ["click", "value"] {
        if !events.iter().any(|e| e == implicit) && doc.attribute(id, &format!("data-{}", implicit)).is_some() {
            events.push(implicit.to_string());
        }
    }

    let mut listeners = Vec::new();
    for event in events {
        let Some(raw) = doc.attribute(id, &format!("data-{}", event)) else {
            continue;
        };

        if event == "value" {
            match PropertyPath::parse(raw) {
                Some(property) => listeners.push(Listener::Value { property }),
                None => tracing::warn!("Ignoring data-value=\"{}\": not a property path", raw),
            }
            continue;
        }

        match CallExpr::parse(raw) {
            Some(call) => listeners.push(Listener::Call { event, call }),
            None => tracing::warn!("Ignoring data-{}=\"{}\": not a method call", event, raw),
        }
    }
    listeners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_resolved;
    use crate::definition::ComponentDefinition;
    use crate::host::HostElement;

    fn setup(markup: &str) -> (RenderRoot, Model) {
        let def = ComponentDefinition::builder("Form").state("name", "Bob").build();
        let model = Model::new(def, HostElement::new("ao-form"));
        (RenderRoot::new(compile_resolved(markup).unwrap().instantiate()), model)
    }

    #[test]
    fn test_shorthand_and_plain_attributes_are_wired() {
        let (mut root, mut model) =
            setup(r#"<button (click)="save()">a</button><button data-click="reset">b</button><div (mouseover)="peek(1)"></div>"#);
        wire(&mut root, &mut model);
        assert_eq!(root.listener_count(), 3);

        let div = root.doc.find_by_tag("div")[0];
        assert_eq!(
            root.listeners(div),
            &[Listener::Call {
                event: "mouseover".to_string(),
                call: CallExpr::parse("peek(1)").unwrap(),
            }]
        );
    }

    #[test]
    fn test_wiring_is_idempotent() {
        let (mut root, mut model) = setup(r#"<button (click)="save()">a</button>"#);
        wire(&mut root, &mut model);
        wire(&mut root, &mut model);
        assert_eq!(root.listener_count(), 1);
    }

    #[test]
    fn test_value_control_is_initialized_from_state() {
        let (mut root, mut model) = setup(r#"<input (value)="name">"#);
        wire(&mut root, &mut model);
        let input = root.doc.find_by_tag("input")[0];
        assert_eq!(root.doc.value(input).as_deref(), Some("Bob"));
        assert_eq!(root.doc.attribute(input, "data-value"), Some("name"));
        assert!(matches!(&root.listeners(input)[0], Listener::Value { property } if property.root == "name"));
    }

    #[test]
    fn test_malformed_handler_is_skipped() {
        let (mut root, mut model) = setup(r#"<button (click)="a + b">a</button>"#);
        wire(&mut root, &mut model);
        assert_eq!(root.listener_count(), 0);
    }
}
