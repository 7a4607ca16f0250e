//! The custom element that hosts a component.
//!
//! Input and slot properties get their initial values from here. Attribute
//! names are matched case-insensitively because HTML lowercases them.

use indexmap::IndexMap;
use serde_json::Value;

use crate::value::parse_literal;

#[derive(Debug, Clone, Default)]
pub struct HostElement {
    tag: String,
    attributes: IndexMap<String, String>,
    /// Attributes as they were when the component was created
    original: IndexMap<String, String>,
}

impl HostElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        find(&self.attributes, name)
    }

    pub fn original_attribute(&self, name: &str) -> Option<&str> {
        find(&self.original, name)
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        let key = self
            .attributes
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.to_string());
        self.attributes.insert(key, value.to_string());
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.retain(|k, _| !k.eq_ignore_ascii_case(name));
    }

    /// Freeze the current attributes as the originals
    pub(crate) fn snapshot(&mut self) {
        self.original = self.attributes.clone();
    }

    /// Value given through the `[propName]="literal"` spelling
    pub fn bracketed(&self, property: &str) -> Option<Value> {
        find(&self.original, &format!("[{}]", property)).map(parse_literal)
    }
}

fn find<'a>(map: &'a IndexMap<String, String>, name: &str) -> Option<&'a str> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
