//! Component Definitions
//!
//! Everything a component class declares up front: its selector, template
//! assets, the state/input/slot property tables and the method table. A
//! definition is built once through [`ComponentDefinition::builder`] and is
//! read-only afterwards; every instance of the class shares it through an `Rc`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

use crate::assets::{AssetSource, Assets};
use crate::cache::{TemplateCache, DEFAULT_CAPACITY};
use crate::compile::CompiledTemplate;
use crate::error::{MethodError, Result};
use crate::model::Context;

/// A component method. Receives the instance context and the resolved arguments.
pub type MethodFn = Rc<dyn Fn(&mut Context<'_>, &[Value]) -> std::result::Result<Value, MethodError>>;

/// Runs once per instance after the template is attached and before the first sync
pub type InitHook = Rc<dyn Fn(&mut Context<'_>)>;

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY SPECS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    pub name: String,
    /// Host attribute to read the initial value from (input properties)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl PropertySpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_attribute(mut self, attribute: &str) -> Self {
        self.attribute_name = Some(attribute.to_string());
        self
    }

    /// Host attribute name; HTML attribute names are lowercase
    pub fn attribute(&self) -> String {
        self.attribute_name
            .clone()
            .unwrap_or_else(|| self.name.to_lowercase())
    }

    pub fn default_or_null(&self) -> Value {
        self.default_value.clone().unwrap_or(Value::Null)
    }
}

#[derive(Clone)]
pub struct MethodEntry {
    pub handler: MethodFn,
    /// Callable from template expressions and event handlers
    pub exposed: bool,
}

impl fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodEntry")
            .field("exposed", &self.exposed)
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEFINITION
// ═══════════════════════════════════════════════════════════════════════════════

pub struct ComponentDefinition {
    name: String,
    selector: Option<String>,
    source: AssetSource,
    assets: OnceCell<Assets>,
    state_props: Vec<PropertySpec>,
    input_props: Vec<PropertySpec>,
    slot_props: Vec<PropertySpec>,
    methods: IndexMap<String, MethodEntry>,
    on_init: Option<InitHook>,
    cache: RefCell<TemplateCache>,
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("name", &self.name)
            .field("selector", &self.selector)
            .field("source", &self.source)
            .field("state_props", &self.state_props)
            .field("input_props", &self.input_props)
            .field("slot_props", &self.slot_props)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

impl ComponentDefinition {
    pub fn builder(name: &str) -> ComponentBuilder {
        ComponentBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }

    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    pub fn state_properties(&self) -> &[PropertySpec] {
        &self.state_props
    }

    pub fn input_properties(&self) -> &[PropertySpec] {
        &self.input_props
    }

    pub fn slot_properties(&self) -> &[PropertySpec] {
        &self.slot_props
    }

    pub fn state_property(&self, name: &str) -> Option<&PropertySpec> {
        self.state_props.iter().find(|p| p.name == name)
    }

    pub fn input_property(&self, name: &str) -> Option<&PropertySpec> {
        self.input_props.iter().find(|p| p.name == name)
    }

    pub fn slot_property(&self, name: &str) -> Option<&PropertySpec> {
        self.slot_props.iter().find(|p| p.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodEntry> {
        self.methods.get(name)
    }

    pub fn is_exposed(&self, name: &str) -> bool {
        self.methods.get(name).map(|m| m.exposed).unwrap_or(false)
    }

    pub fn exposed_methods(&self) -> impl Iterator<Item = &str> {
        self.methods
            .iter()
            .filter(|(_, m)| m.exposed)
            .map(|(name, _)| name.as_str())
    }

    pub fn on_init(&self) -> Option<&InitHook> {
        self.on_init.as_ref()
    }

    // ─── assets ───────────────────────────────────────────────────────────────

    /// Assets if available. Inline sources are always available; file sources
    /// only after [`load_assets`](Self::load_assets) or
    /// [`provide_assets`](Self::provide_assets).
    pub fn assets(&self) -> Option<&Assets> {
        match &self.source {
            AssetSource::Inline(inline) => Some(self.assets.get_or_init(|| inline.clone())),
            AssetSource::Files { .. } => self.assets.get(),
        }
    }

    /// Read file assets once for the whole class
    pub fn load_assets(&self) -> Result<&Assets> {
        if let Some(assets) = self.assets.get() {
            return Ok(assets);
        }
        let loaded = self.source.load()?;
        tracing::debug!("Loaded assets for component '{}'", self.name);
        Ok(self.assets.get_or_init(|| loaded))
    }

    /// Like [`load_assets`](Self::load_assets) but unreadable files become empty text
    pub fn load_assets_or_empty(&self) -> &Assets {
        self.assets.get_or_init(|| self.source.load_or_empty())
    }

    /// Supply assets fetched elsewhere. Returns false if assets were already set.
    pub fn provide_assets(&self, assets: Assets) -> bool {
        self.assets.set(assets).is_ok()
    }

    // ─── templates ────────────────────────────────────────────────────────────

    /// Compile placeholder-resolved markup, reusing the class-level cache
    pub fn compile(&self, markup: &str) -> Result<Rc<CompiledTemplate>> {
        self.cache.borrow_mut().get_or_compile(markup)
    }

    pub fn cached_templates(&self) -> usize {
        self.cache.borrow().len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUERY INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_state_properties(definition: &ComponentDefinition) -> &[PropertySpec] {
    definition.state_properties()
}

pub fn get_input_properties(definition: &ComponentDefinition) -> &[PropertySpec] {
    definition.input_properties()
}

pub fn get_slot_properties(definition: &ComponentDefinition) -> &[PropertySpec] {
    definition.slot_properties()
}

pub fn get_exposed_methods(definition: &ComponentDefinition) -> Vec<String> {
    definition.exposed_methods().map(str::to_string).collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct ComponentBuilder {
    name: String,
    selector: Option<String>,
    template: Option<String>,
    style: Option<String>,
    template_path: Option<PathBuf>,
    style_path: Option<PathBuf>,
    source: Option<AssetSource>,
    state_props: Vec<PropertySpec>,
    input_props: Vec<PropertySpec>,
    slot_props: Vec<PropertySpec>,
    methods: IndexMap<String, MethodEntry>,
    on_init: Option<InitHook>,
    cache_capacity: usize,
}

impl ComponentBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            selector: None,
            template: None,
            style: None,
            template_path: None,
            style_path: None,
            source: None,
            state_props: Vec::new(),
            input_props: Vec::new(),
            slot_props: Vec::new(),
            methods: IndexMap::new(),
            on_init: None,
            cache_capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn selector(mut self, selector: &str) -> Self {
        self.selector = Some(selector.to_string());
        self
    }

    pub fn template(mut self, template: &str) -> Self {
        self.template = Some(template.to_string());
        self
    }

    pub fn style(mut self, style: &str) -> Self {
        self.style = Some(style.to_string());
        self
    }

    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template_path = Some(path.into());
        self
    }

    pub fn style_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.style_path = Some(path.into());
        self
    }

    /// Use a ready-made source, e.g. one found by
    /// [`discover_assets`](crate::assets::discover_assets)
    pub fn assets(mut self, source: AssetSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn state(self, name: &str, default: impl Into<Value>) -> Self {
        self.state_spec(PropertySpec::new(name).with_default(default))
    }

    pub fn input(self, name: &str, default: impl Into<Value>) -> Self {
        self.input_spec(PropertySpec::new(name).with_default(default))
    }

    pub fn slot(self, name: &str, default: impl Into<Value>) -> Self {
        self.slot_spec(PropertySpec::new(name).with_default(default))
    }

    pub fn state_spec(mut self, spec: PropertySpec) -> Self {
        upsert(&mut self.state_props, spec);
        self
    }

    pub fn input_spec(mut self, spec: PropertySpec) -> Self {
        upsert(&mut self.input_props, spec);
        self
    }

    pub fn slot_spec(mut self, spec: PropertySpec) -> Self {
        upsert(&mut self.slot_props, spec);
        self
    }

    /// Register a method callable from templates
    pub fn expose<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, &[Value]) -> std::result::Result<Value, MethodError> + 'static,
    {
        self.add_method(name, Rc::new(handler), true)
    }

    /// Register a method only callable from Rust
    pub fn method<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, &[Value]) -> std::result::Result<Value, MethodError> + 'static,
    {
        self.add_method(name, Rc::new(handler), false)
    }

    pub fn on_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Context<'_>) + 'static,
    {
        self.on_init = Some(Rc::new(hook));
        self
    }

    fn add_method(mut self, name: &str, handler: MethodFn, exposed: bool) -> Self {
        self.methods
            .insert(name.to_string(), MethodEntry { handler, exposed });
        self
    }

    /// Compiled templates kept for the class, one per distinct placeholder result
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn build(self) -> Rc<ComponentDefinition> {
        let has_files = self.template_path.is_some() || self.style_path.is_some();
        let source = match self.source {
            Some(source) => source,
            None if has_files => {
                if self.template.is_some() || self.style.is_some() {
                    tracing::warn!(
                        "Component '{}' declares both inline and file assets; using files",
                        self.name
                    );
                }
                AssetSource::Files {
                    template_path: self.template_path,
                    style_path: self.style_path,
                }
            }
            None => AssetSource::Inline(Assets {
                template: self.template.unwrap_or_default(),
                style: self.style.unwrap_or_default(),
            }),
        };

        Rc::new(ComponentDefinition {
            name: self.name,
            selector: self.selector,
            source,
            assets: OnceCell::new(),
            state_props: self.state_props,
            input_props: self.input_props,
            slot_props: self.slot_props,
            methods: self.methods,
            on_init: self.on_init,
            cache: RefCell::new(TemplateCache::with_capacity(self.cache_capacity)),
        })
    }
}

/// Later declarations of the same property replace earlier ones
fn upsert(specs: &mut Vec<PropertySpec>, spec: PropertySpec) {
    match specs.iter_mut().find(|s| s.name == spec.name) {
        Some(existing) => *existing = spec,
        None => specs.push(spec),
    }
}
