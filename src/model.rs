//! Component Model
//!
//! The non-DOM half of an instance: the state bag, the resolved input and slot
//! properties, the host element and the class definition. Every write goes
//! through [`Model::apply_write`], which keeps the state bag and the property
//! view consistent; the component layer adds the refresh on top.

use indexmap::IndexMap;
use serde_json::Value;
use std::rc::Rc;

use crate::definition::ComponentDefinition;
use crate::error::MethodError;
use crate::host::HostElement;
use crate::value::{display, walk, StateBag};

pub struct Model {
    definition: Rc<ComponentDefinition>,
    state: StateBag,
    properties: IndexMap<String, Value>,
    host: HostElement,
}

impl Model {
    pub fn new(definition: Rc<ComponentDefinition>, mut host: HostElement) -> Self {
        host.snapshot();

        let mut state = StateBag::new();
        for spec in definition.state_properties() {
            state.insert(spec.name.clone(), spec.default_or_null());
        }

        let mut properties = IndexMap::new();
        for spec in definition.input_properties() {
            let value = host
                .original_attribute(&spec.attribute())
                .map(|raw| Value::String(raw.to_string()))
                .or_else(|| host.bracketed(&spec.name))
                .unwrap_or_else(|| spec.default_or_null());
            properties.insert(spec.name.clone(), value);
        }
        for spec in definition.slot_properties() {
            let value = host
                .original_attribute(&spec.attribute())
                .map(|raw| Value::String(raw.to_string()))
                .unwrap_or_else(|| spec.default_or_null());
            properties.insert(spec.name.clone(), value);
        }

        Self {
            definition,
            state,
            properties,
            host,
        }
    }

    pub fn definition(&self) -> &Rc<ComponentDefinition> {
        &self.definition
    }

    pub fn state(&self) -> &StateBag {
        &self.state
    }

    pub fn host(&self) -> &HostElement {
        &self.host
    }

    pub fn properties(&self) -> &IndexMap<String, Value> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Bare-name lookup: state first, then the instance property
    pub fn get(&self, name: &str) -> Option<Value> {
        self.state
            .get(name)
            .or_else(|| self.properties.get(name))
            .cloned()
    }

    /// Dotted-path lookup, e.g. `user.name`
    pub fn get_path(&self, path: &str) -> Option<Value> {
        let mut segments = path.split('.');
        let base = self.get(segments.next()?)?;
        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() {
            Some(base)
        } else {
            walk(&base, &rest)
        }
    }

    /// Write path steps 1 and 2: the state bag, then the property view
    pub fn apply_write(&mut self, name: &str, value: Value) {
        self.state.insert(name.to_string(), value.clone());

        if let Some(spec) = self.definition.input_property(name) {
            let attribute = spec.attribute();
            match &value {
                Value::Null => self.host.remove_attribute(&attribute),
                other => self.host.set_attribute(&attribute, &display(Some(other))),
            }
            self.properties.insert(name.to_string(), value);
        } else if self.definition.slot_property(name).is_some() {
            self.properties.insert(name.to_string(), value);
        }
    }

    /// Value substituted for `[[ name ]]`
    pub fn placeholder(&self, name: &str) -> Option<String> {
        if let Some(value) = self.properties.get(name) {
            return Some(display(Some(value)));
        }
        self.host.attribute(name).map(str::to_string)
    }

    // ─── methods ──────────────────────────────────────────────────────────────

    /// Run any registered method. `None` when the method does not exist.
    pub fn invoke(&mut self, name: &str, args: &[Value]) -> Option<Result<Value, MethodError>> {
        let definition = Rc::clone(&self.definition);
        let entry = definition.method(name)?;
        let mut context = Context { model: self };
        Some((entry.handler)(&mut context, args))
    }

    /// Run a method on behalf of a template. Only exposed methods run; errors
    /// are logged and read as undefined.
    pub fn invoke_from_template(&mut self, name: &str, args: &[Value]) -> Option<Value> {
        if !self.definition.is_exposed(name) {
            tracing::warn!(
                "Refusing to call '{}' on <{}>: method is not exposed",
                name,
                self.host.tag()
            );
            return None;
        }

        match self.invoke(name, args)? {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Method '{}' on <{}> failed: {}", name, self.host.tag(), e);
                None
            }
        }
    }

    pub fn context(&mut self) -> Context<'_> {
        Context { model: self }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// METHOD CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// What a component method sees. Writes update the state bag immediately;
/// the refresh happens once the outermost invocation returns.
pub struct Context<'a> {
    model: &'a mut Model,
}

impl Context<'_> {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.model.get_path(name)
    }

    pub fn get_i64(&self, name: &str) -> i64 {
        self.get(name).and_then(|v| v.as_i64()).unwrap_or(0)
    }

    pub fn get_str(&self, name: &str) -> String {
        display(self.get(name).as_ref())
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.model.apply_write(name, value.into());
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

    /// Call another method of the same component, exposed or not
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, MethodError> {
        match self.model.invoke(name, args) {
            Some(result) => result,
            None => Err(MethodError::failed(format!("no method named '{}'", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn card() -> Rc<ComponentDefinition> {
        ComponentDefinition::builder("Card")
            .state("count", 0)
            .state("user", json!({"name": "Ana"}))
            .input("title", "Untitled")
            .input("size", 1)
            .slot("footer", "none")
            .expose("bump", |ctx, _| {
                let next = ctx.get_i64("count") + 1;
                ctx.set("count", next);
                Ok(json!(next))
            })
            .expose("fail", |ctx, _| {
                ctx.set("count", 99);
                Err(MethodError::failed("boom"))
            })
            .method("secret", |_, _| Ok(json!("hidden")))
            .build()
    }

    #[test]
    fn test_state_is_seeded_from_defaults() {
        let model = Model::new(card(), HostElement::new("ao-card"));
        assert_eq!(model.state().get("count"), Some(&json!(0)));
        assert_eq!(model.get_path("user.name"), Some(json!("Ana")));
        assert_eq!(model.property("title"), Some(&json!("Untitled")));
        assert_eq!(model.property("footer"), Some(&json!("none")));
    }

    #[test]
    fn test_input_resolution_order() {
        let host = HostElement::new("ao-card")
            .with_attribute("title", "From attribute")
            .with_attribute("[title]", "\"ignored\"")
            .with_attribute("[size]", "3");
        let model = Model::new(card(), host);
        assert_eq!(model.property("title"), Some(&json!("From attribute")));
        assert_eq!(model.property("size"), Some(&json!(3)));
    }

    #[test]
    fn test_input_write_reflects_to_host() {
        let mut model = Model::new(card(), HostElement::new("ao-card"));
        model.apply_write("title", json!("Hi"));
        assert_eq!(model.get("title"), Some(json!("Hi")));
        assert_eq!(model.property("title"), Some(&json!("Hi")));
        assert_eq!(model.host().attribute("title"), Some("Hi"));

        model.apply_write("title", Value::Null);
        assert!(model.host().attribute("title").is_none());
    }

    #[test]
    fn test_placeholder_prefers_properties() {
        let host = HostElement::new("ao-card").with_attribute("heading", "Raw");
        let model = Model::new(card(), host);
        assert_eq!(model.placeholder("title").as_deref(), Some("Untitled"));
        assert_eq!(model.placeholder("heading").as_deref(), Some("Raw"));
        assert_eq!(model.placeholder("nothing"), None);
    }

    #[test]
    fn test_template_invocation_is_gated() {
        let mut model = Model::new(card(), HostElement::new("ao-card"));
        assert_eq!(model.invoke_from_template("bump", &[]), Some(json!(1)));
        assert_eq!(model.invoke_from_template("secret", &[]), None);
        assert_eq!(model.invoke_from_template("missing", &[]), None);
        assert_eq!(model.invoke("secret", &[]), Some(Ok(json!("hidden"))));
    }

    #[test]
    fn test_failed_method_keeps_partial_writes() {
        let mut model = Model::new(card(), HostElement::new("ao-card"));
        assert_eq!(model.invoke_from_template("fail", &[]), None);
        assert_eq!(model.get("count"), Some(json!(99)));
    }
}
