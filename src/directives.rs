//! Directive Evaluator
//!
//! `*if` toggles the hidden flag; the element never leaves the tree.
//!
//! `*for` re-materializes from scratch on every evaluation: the clones made
//! last time are removed, then one deep clone of the template is inserted
//! before it per collection item. There is no diffing or keying. Each clone
//! gets a loop frame in the side table, so expressions inside it (including
//! nested `*for` collections) see the loop variable.
//!
//! Conditions are evaluated before loops. A hidden `*if` ancestor does not stop
//! a loop from materializing.

use serde_json::Value;

use crate::dom::{LoopDirective, NodeId};
use crate::expression::{CallExpr, PropertyPath};
use crate::model::Model;
use crate::render::{LoopFrame, NodeScope, RenderRoot};
use crate::sync::{sync_subtree, SyncPass};

pub fn evaluate_directives(root: &mut RenderRoot, model: &mut Model) {
    evaluate_directives_with(root, model, SyncPass::All);
}

/// Like [`evaluate_directives`], syncing fresh clones with `clone_pass`. The
/// refresh pipeline passes [`SyncPass::Values`] because it recomputes function
/// bindings across the whole tree afterwards.
pub fn evaluate_directives_with(root: &mut RenderRoot, model: &mut Model, clone_pass: SyncPass) {
    let start = root.doc.root();
    evaluate_conditions(root, model, start);
    materialize_loops_in(root, model, start, clone_pass);
}

pub fn evaluate_conditions(root: &mut RenderRoot, model: &mut Model, start: NodeId) {
    for id in root.live_nodes(start) {
        let Some(condition) = root.doc.markers(id).and_then(|m| m.condition.clone()) else {
            continue;
        };
        let frames = root.frames_for(id);
        let visible = condition.is_truthy(&mut NodeScope::new(model, frames));
        root.doc.set_hidden(id, !visible);
    }
}

pub fn materialize_loops_in(root: &mut RenderRoot, model: &mut Model, start: NodeId, clone_pass: SyncPass) {
    for template in root.loop_templates(start) {
        materialize(root, model, template, clone_pass);
    }
}

/// Rebuild the clones of one loop template
pub fn materialize(root: &mut RenderRoot, model: &mut Model, template: NodeId, clone_pass: SyncPass) {
    let stale = root.take_clones(template);
    root.remove_nodes(&stale);

    let Some(LoopDirective::Each { item, collection }) =
        root.doc.markers(template).and_then(|m| m.repeat.clone())
    else {
        return;
    };
    let Some(parent) = root.doc.parent(template) else {
        return;
    };

    let frames = root.frames_for(template);
    let items = match collection.resolve(&NodeScope::new(model, frames)) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            tracing::trace!("*for collection '{}' is not a list ({}); no iterations", collection, other);
            return;
        }
        None => return,
    };

    let mut created = Vec::with_capacity(items.len());
    for (index, value) in items.into_iter().enumerate() {
        let Some(clone) = root.doc.deep_clone(template) else {
            continue;
        };
        if let Some(markers) = root.doc.markers_mut(clone) {
            markers.repeat = None;
        }
        root.doc.set_hidden(clone, false);
        root.set_scope(
            clone,
            LoopFrame {
                item: item.clone(),
                value,
                index,
                collection: collection.clone(),
            },
        );
        created.push(clone);
    }
    root.doc.insert_all_before(parent, &created, Some(template));
    root.set_clones(template, created.clone());

    for clone in created {
        capture_arguments(root, clone);
        evaluate_conditions(root, model, clone);
        sync_subtree(root, model, clone, clone_pass);
        materialize_loops_in(root, model, clone, clone_pass);
    }
}

/// Record, per handler, the values of arguments that name a loop variable, so
/// a later event passes what the clone was rendered with.
fn capture_arguments(root: &mut RenderRoot, clone: NodeId) {
    for id in root.live_nodes(clone) {
        let Some(markers) = root.doc.markers(id) else {
            continue;
        };
        let mut events = markers.events.clone();
        if !events.iter().any(|e| e == "click") && root.doc.attribute(id, "data-click").is_some() {
            events.push("click".to_string());
        }

        let frames = root.frames_for(id);
        for event in events {
            if event == "value" {
                continue;
            }
            let Some(call) = root
                .doc
                .attribute(id, &format!("data-{}", event))
                .and_then(CallExpr::parse)
            else {
                continue;
            };
            if call.args.is_empty() {
                continue;
            }

            let captured: Vec<Option<Value>> = call
                .args
                .iter()
                .map(|arg| {
                    let path = PropertyPath::parse(arg)?;
                    let frame = frames.iter().find(|f| f.item == path.root)?;
                    if path.rest.is_empty() {
                        Some(frame.value.clone())
                    } else {
                        crate::value::walk(&frame.value, &path.rest)
                    }
                })
                .collect();

            if captured.iter().any(Option::is_some) {
                root.set_captures(id, &event, captured);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_resolved;
    use crate::definition::ComponentDefinition;
    use crate::host::HostElement;
    use serde_json::json;

    fn render(markup: &str, model: &mut Model) -> RenderRoot {
        let mut root = RenderRoot::new(compile_resolved(markup).unwrap().instantiate());
        evaluate_directives(&mut root, model);
        root
    }

    fn list_model(items: Value) -> Model {
        let def = ComponentDefinition::builder("List").state("items", items).build();
        Model::new(def, HostElement::new("ao-list"))
    }

    #[test]
    fn test_clones_are_inserted_before_template() {
        let mut model = list_model(json!(["a", "b"]));
        let root = render(r#"<ul><li *for="item of items">{{ item }}</li></ul>"#, &mut model);
        assert_eq!(
            root.doc.to_html(),
            r#"<ul><li>a</li><li>b</li><li style="display: none"></li></ul>"#
        );
    }

    #[test]
    fn test_non_list_collection_has_no_iterations() {
        let mut model = list_model(json!("abc"));
        let root = render(r#"<ul><li *for="item of items">{{ item }}</li></ul>"#, &mut model);
        let ul = root.doc.find_by_tag("ul")[0];
        assert_eq!(root.doc.children(ul).len(), 1);
    }

    #[test]
    fn test_rematerializing_replaces_every_clone() {
        let mut model = list_model(json!(["a", "b", "c"]));
        let mut root = render(r#"<ul><li *for="item of items">{{ item }}</li></ul>"#, &mut model);
        let template = root.doc.find_by_tag("li")[3];
        let first = root.clones_of(template).to_vec();
        let size = root.doc.len();

        model.apply_write("items", json!(["x", "y", "z"]));
        evaluate_directives(&mut root, &mut model);
        assert_eq!(root.doc.len(), size);
        assert!(first.iter().all(|&clone| !root.doc.contains(clone)));
        assert!(first.iter().all(|&clone| root.scope_of(clone).is_none()));
        assert_eq!(
            root.doc.to_html(),
            r#"<ul><li>x</li><li>y</li><li>z</li><li style="display: none"></li></ul>"#
        );
    }

    #[test]
    fn test_values_pass_leaves_function_bindings_to_caller() {
        let def = ComponentDefinition::builder("List")
            .state("items", json!(["a", "b"]))
            .expose("label", |_, _| Ok(json!("L")))
            .build();
        let mut model = Model::new(def, HostElement::new("ao-list"));
        let mut root = RenderRoot::new(
            compile_resolved(r#"<ul><li *for="item of items"><b>{{ item }}</b><i>{{ label() }}</i></li></ul>"#)
                .unwrap()
                .instantiate(),
        );
        evaluate_directives_with(&mut root, &mut model, SyncPass::Values);

        let visible = |tag: &str| -> Vec<String> {
            root.doc
                .find_by_tag(tag)
                .into_iter()
                .filter(|&id| root.doc.is_visible(id))
                .map(|id| root.doc.text_content(id))
                .collect()
        };
        assert_eq!(visible("b"), vec!["a", "b"]);
        assert_eq!(visible("i"), vec!["", ""]);
    }

    #[test]
    fn test_loop_frames_expose_index() {
        let mut model = list_model(json!(["a", "b", "c"]));
        let root = render(
            r#"<ol><li *for="let item of items" data-pos="{{ $index }}">{{ item }}</li></ol>"#,
            &mut model,
        );
        let positions: Vec<_> = root
            .doc
            .find_by_tag("li")
            .into_iter()
            .filter(|&li| root.doc.is_visible(li))
            .filter_map(|li| root.doc.attribute(li, "data-pos").map(str::to_string))
            .collect();
        assert_eq!(positions, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_arguments_are_captured_per_clone() {
        let mut model = list_model(json!([{"id": 7}, {"id": 9}]));
        let root = render(
            r#"<ul><li *for="item of items"><button (click)="remove(item.id, 'x')">x</button></li></ul>"#,
            &mut model,
        );
        let buttons: Vec<_> = root
            .doc
            .find_by_tag("button")
            .into_iter()
            .filter(|&b| root.doc.is_visible(b))
            .collect();
        assert_eq!(buttons.len(), 2);
        assert_eq!(root.captures(buttons[0], "click"), Some(&[Some(json!(7)), None][..]));
        assert_eq!(root.captures(buttons[1], "click"), Some(&[Some(json!(9)), None][..]));
    }
}
