//! Component Instances
//!
//! Lifecycle of one custom element:
//!
//! ```text
//! connect ──► assets ready? ──no──► Pending ──resume()──► render (once)
//!                 │
//!                yes
//!                 ▼
//!   compile (cached) → attach → on_init → sync → wire → *if/*for → wire clones
//! ```
//!
//! After that, every state write runs the refresh pipeline once:
//! value bindings, directives, function bindings, then wiring for new clones.

use serde::Serialize;
use serde_json::Value;
use std::rc::Rc;

use crate::assets::Assets;
use crate::compile::{assemble_source, resolve_placeholders, CompiledTemplate};
use crate::definition::ComponentDefinition;
use crate::directives::{evaluate_directives, evaluate_directives_with};
use crate::dom::{Document, NodeId};
use crate::error::{Result, RuntimeError};
use crate::expression::{resolve_argument, CallExpr, PropertyPath};
use crate::host::HostElement;
use crate::model::Model;
use crate::render::{Listener, LoopFrame, NodeScope, RenderRoot};
use crate::sync::{sync, sync_function_bindings, SyncPass};
use crate::value::{set_path, StateBag};
use crate::wiring::{wire, VALUE_EVENTS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderStatus {
    /// The render root exists and is in sync
    Complete,
    /// Waiting for template assets; call [`Component::resume`] once loaded
    Pending,
    /// The instance was disconnected before it could render
    Detached,
}

/// A DOM event delivered to a rendered node
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: String,
    /// Control value carried by input-like events
    pub value: Option<String>,
}

impl Event {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            value: None,
        }
    }

    pub fn with_value(kind: &str, value: &str) -> Self {
        Self {
            kind: kind.to_string(),
            value: Some(value.to_string()),
        }
    }
}

/// The property and nested segments a control path writes. A path rooted at a
/// loop variable is rewritten into the collection the clone was rendered
/// from, so `item.name` in the third row of `items` becomes `items.2.name`.
fn write_target(property: &PropertyPath, frames: &[LoopFrame]) -> Option<(String, Vec<String>)> {
    let mut name = property.root.clone();
    let mut segments = property.rest.clone();
    let mut outer = frames;
    while let Some(position) = outer.iter().position(|f| f.item == name) {
        let frame = &outer[position];
        let mut expanded = frame.collection.rest.clone();
        expanded.push(frame.index.to_string());
        expanded.extend(segments);
        name = frame.collection.root.clone();
        segments = expanded;
        outer = &outer[position + 1..];
    }
    (name != "$index").then_some((name, segments))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<'a> {
    selector: &'a str,
    state: &'a StateBag,
    properties: &'a indexmap::IndexMap<String, Value>,
    html: String,
}

pub struct Component {
    model: Model,
    root: Option<RenderRoot>,
    connected: bool,
    pending: bool,
}

impl Component {
    pub fn new(definition: Rc<ComponentDefinition>, host: HostElement) -> Self {
        Self {
            model: Model::new(definition, host),
            root: None,
            connected: false,
            pending: false,
        }
    }

    pub fn definition(&self) -> &Rc<ComponentDefinition> {
        self.model.definition()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_rendered(&self) -> bool {
        self.root.is_some()
    }

    pub fn status(&self) -> RenderStatus {
        if self.root.is_some() {
            RenderStatus::Complete
        } else if self.connected {
            RenderStatus::Pending
        } else {
            RenderStatus::Detached
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Element inserted into the document. Renders at most once per instance.
    pub fn connect(&mut self) -> RenderStatus {
        self.connected = true;
        if self.root.is_some() {
            return RenderStatus::Complete;
        }

        let definition = Rc::clone(self.model.definition());
        match definition.assets() {
            Some(assets) => {
                self.render(assets);
                RenderStatus::Complete
            }
            None => {
                tracing::debug!(
                    "Assets for <{}> not loaded yet; deferring connection",
                    self.model.host().tag()
                );
                self.pending = true;
                RenderStatus::Pending
            }
        }
    }

    /// Retry a deferred connection. Runs the connection sequence exactly once;
    /// if assets are still missing the template renders empty.
    pub fn resume(&mut self) -> RenderStatus {
        if !self.connected {
            tracing::debug!("Not resuming <{}>: disconnected", self.model.host().tag());
            return RenderStatus::Detached;
        }
        if self.root.is_some() || !self.pending {
            return self.status();
        }
        self.pending = false;

        let definition = Rc::clone(self.model.definition());
        match definition.assets() {
            Some(assets) => self.render(assets),
            None => {
                tracing::warn!(
                    "Assets for <{}> still unavailable; rendering an empty template",
                    self.model.host().tag()
                );
                self.render(&Assets::default());
            }
        }
        RenderStatus::Complete
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
        self.pending = false;
    }

    fn render(&mut self, assets: &Assets) {
        let definition = Rc::clone(self.model.definition());
        let model = &self.model;
        let markup = resolve_placeholders(&assemble_source(&assets.template, &assets.style), |name| {
            model.placeholder(name)
        });

        let compiled = match definition.compile(&markup) {
            Ok(compiled) => compiled,
            Err(e) => {
                tracing::error!("Template for <{}> failed to compile: {}", self.model.host().tag(), e);
                Rc::new(CompiledTemplate {
                    document: Document::new(),
                    summary: Default::default(),
                })
            }
        };
        tracing::debug!(
            "Rendering <{}> ({} text, {} function, {} attribute bindings)",
            self.model.host().tag(),
            compiled.summary.text_bindings,
            compiled.summary.function_bindings,
            compiled.summary.attribute_bindings
        );

        let mut root = RenderRoot::new(compiled.instantiate());

        if let Some(hook) = definition.on_init() {
            hook(&mut self.model.context());
        }

        sync(&mut root, &mut self.model, SyncPass::All);
        wire(&mut root, &mut self.model);
        evaluate_directives(&mut root, &mut self.model);
        wire(&mut root, &mut self.model);

        self.root = Some(root);
    }

    /// Re-apply everything that depends on state. No-op before the first render.
    pub fn refresh(&mut self) {
        let Some(root) = self.root.as_mut() else {
            return;
        };
        tracing::trace!("Refreshing <{}>", self.model.host().tag());
        sync(root, &mut self.model, SyncPass::Values);
        evaluate_directives_with(root, &mut self.model, SyncPass::Values);
        sync_function_bindings(root, &mut self.model);
        wire(root, &mut self.model);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATE
    // ═══════════════════════════════════════════════════════════════════════════

    /// The one write path: state bag, property view, then a single refresh
    pub fn write_state(&mut self, name: &str, value: impl Into<Value>) {
        self.model.apply_write(name, value.into());
        self.refresh();
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.model.get_path(name)
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.model.property(name)
    }

    pub fn state(&self) -> &StateBag {
        self.model.state()
    }

    pub fn host(&self) -> &HostElement {
        self.model.host()
    }

    /// Invoke any registered method from Rust, exposed or not, then refresh
    pub fn call(&mut self, method: &str, args: &[Value]) -> Result<Value> {
        let outcome = self.model.invoke(method, args);
        let Some(result) = outcome else {
            return Err(RuntimeError::UnknownMethod {
                component: self.model.definition().name().to_string(),
                method: method.to_string(),
            });
        };
        self.refresh();
        result.map_err(|source| RuntimeError::Method {
            method: method.to_string(),
            source,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVENTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deliver an event at `target` and bubble it to the root. Returns whether
    /// any listener ran.
    pub fn dispatch(&mut self, target: NodeId, event: &Event) -> bool {
        let path: Vec<NodeId> = match &self.root {
            Some(root) if root.doc.contains(target) => std::iter::once(target)
                .chain(root.doc.ancestors(target))
                .collect(),
            _ => return false,
        };

        let mut handled = false;
        for node in path {
            let listeners = match &self.root {
                Some(root) if root.doc.contains(node) => root.listeners(node).to_vec(),
                _ => continue,
            };
            for listener in listeners {
                match listener {
                    Listener::Call { event: kind, call } if kind == event.kind => {
                        self.run_handler(node, &kind, &call);
                        handled = true;
                    }
                    Listener::Value { property } if VALUE_EVENTS.contains(&event.kind.as_str()) => {
                        self.write_control(node, &property, event);
                        handled = true;
                    }
                    _ => {}
                }
            }
        }
        handled
    }

    pub fn click(&mut self, target: NodeId) -> bool {
        self.dispatch(target, &Event::new("click"))
    }

    /// Type into a control: set its live value, then fire `input`
    pub fn input(&mut self, target: NodeId, text: &str) -> bool {
        if let Some(root) = self.root.as_mut() {
            root.doc.set_value(target, text);
        }
        self.dispatch(target, &Event::with_value("input", text))
    }

    fn run_handler(&mut self, node: NodeId, event: &str, call: &CallExpr) {
        let Some(root) = self.root.as_ref() else {
            return;
        };
        let captured = root.captures(node, event).map(|c| c.to_vec()).unwrap_or_default();
        let scope = NodeScope::new(&mut self.model, root.frames_for(node));
        let args: Vec<Value> = call
            .args
            .iter()
            .enumerate()
            .map(|(i, token)| resolve_argument(token, captured.get(i).and_then(Option::as_ref), &scope))
            .collect();

        self.model.invoke_from_template(&call.method, &args);
        self.refresh();
    }

    fn write_control(&mut self, node: NodeId, property: &PropertyPath, event: &Event) {
        let Some(root) = self.root.as_ref() else {
            return;
        };
        let text = event
            .value
            .clone()
            .or_else(|| root.doc.value(node))
            .unwrap_or_default();

        let frames = root.frames_for(node);
        let in_loop = frames.iter().any(|f| f.item == property.root);
        let Some((name, segments)) = write_target(property, &frames) else {
            tracing::warn!("Control bound to '{}' is not writable", property);
            return;
        };
        let current = self.model.get(&name);
        if in_loop && current.is_none() {
            tracing::warn!(
                "Control bound to '{}' iterates '{}', which is not a property; value dropped",
                property,
                name
            );
            return;
        }

        let value = if segments.is_empty() {
            Value::String(text)
        } else {
            set_path(current, &segments, Value::String(text))
        };
        self.write_state(&name, value);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // INSPECTION
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn document(&self) -> Option<&Document> {
        self.root.as_ref().map(|r| r.document())
    }

    pub fn render_root(&self) -> Option<&RenderRoot> {
        self.root.as_ref()
    }

    /// Serialized render root; empty before the first render
    pub fn html(&self) -> String {
        self.document().map(Document::to_html).unwrap_or_default()
    }

    pub fn snapshot(&self) -> Value {
        let snapshot = Snapshot {
            selector: self.model.host().tag(),
            state: self.model.state(),
            properties: self.model.properties(),
            html: self.html(),
        };
        serde_json::to_value(snapshot).unwrap_or(Value::Null)
    }
}
