//! Registration facade: selector → component definition.

use indexmap::IndexMap;
use std::rc::Rc;

use crate::component::Component;
use crate::definition::ComponentDefinition;
use crate::error::{Result, RuntimeError};
use crate::host::HostElement;

#[derive(Debug, Default)]
pub struct Framework {
    registry: IndexMap<String, Rc<ComponentDefinition>>,
}

impl Framework {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under `selector`. Empty and already-taken selectors are ignored.
    pub fn register_component(&mut self, selector: &str, definition: Rc<ComponentDefinition>) -> bool {
        let selector = selector.trim();
        if selector.is_empty() {
            tracing::warn!("Ignoring component '{}': empty selector", definition.name());
            return false;
        }
        if self.registry.contains_key(selector) {
            tracing::debug!("Selector <{}> already registered; keeping the first", selector);
            return false;
        }
        tracing::debug!("Registered <{}> as '{}'", selector, definition.name());
        self.registry.insert(selector.to_string(), definition);
        true
    }

    /// Register each definition under its own selector. Returns how many were added.
    pub fn register_components<I>(&mut self, definitions: I) -> usize
    where
        I: IntoIterator<Item = Rc<ComponentDefinition>>,
    {
        let mut added = 0;
        for definition in definitions {
            let Some(selector) = definition.selector().map(str::to_string) else {
                tracing::warn!("Component '{}' has no selector; skipping", definition.name());
                continue;
            };
            if self.register_component(&selector, definition) {
                added += 1;
            }
        }
        added
    }

    pub fn get(&self, selector: &str) -> Option<Rc<ComponentDefinition>> {
        self.registry.get(selector).cloned()
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    /// Create an unconnected instance of `selector` with the given host attributes
    pub fn create(&self, selector: &str, attributes: &[(&str, &str)]) -> Result<Component> {
        let definition = self
            .get(selector)
            .ok_or_else(|| RuntimeError::UnknownSelector(selector.to_string()))?;
        let host = attributes
            .iter()
            .fold(HostElement::new(selector), |host, (name, value)| host.with_attribute(name, value));
        Ok(Component::new(definition, host))
    }
}
