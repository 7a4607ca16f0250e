//! Parse Module
//!
//! Turns template markup into a [`Document`] using html5ever. Markup is parsed
//! as the content of a `<template>` element, so table parts such as a bare
//! `<tr *for="..">` keep their place instead of being dropped the way body
//! parsing drops them. The fragment parser's synthetic `<html>` root is
//! flattened away: `<style>..</style><div>..</div>` comes back as two siblings.

use html5ever::tendril::TendrilSink;
use html5ever::{local_name, namespace_url, ns, parse_fragment, QualName};
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;

use crate::dom::{Document, NodeId};
use crate::error::{Result, RuntimeError};

lazy_static! {
    /// `<ao-button />` self-closing custom elements
    static ref SELF_CLOSING_CUSTOM_RE: Regex =
        Regex::new(r"<([a-zA-Z][a-zA-Z0-9]*-[a-zA-Z0-9\-]*)(\s[^<>]*?)?\s*/>").unwrap();
}

/// Convert self-closing custom element tags to properly closed tags.
/// The HTML tree builder treats `<x-item />` as an opening tag, which would
/// nest every following sibling inside it.
fn convert_self_closing_custom_elements(html: &str) -> String {
    SELF_CLOSING_CUSTOM_RE
        .replace_all(html, |caps: &regex::Captures| {
            let name = &caps[1];
            let attrs = caps.get(2).map(|m| m.as_str().trim_end()).unwrap_or("");
            format!("<{}{}></{}>", name, attrs, name)
        })
        .to_string()
}

/// Parse markup into a fresh document
pub fn parse_html(html: &str) -> Result<Document> {
    let prepared = convert_self_closing_custom_elements(html);

    let context = QualName::new(None, ns!(html), local_name!("template"));
    let dom = parse_fragment(RcDom::default(), Default::default(), context, Vec::new())
        .from_utf8()
        .read_from(&mut prepared.as_bytes())
        .map_err(|e| RuntimeError::Parse(e.to_string()))?;

    let mut doc = Document::new();
    let root = doc.root();
    for child in dom.document.children.borrow().iter() {
        collect(child, &mut doc, root);
    }
    Ok(doc)
}

fn collect(handle: &Handle, doc: &mut Document, parent: NodeId) {
    match &handle.data {
        NodeData::Element { name, .. } if name.local == local_name!("html") => {
            for child in handle.children.borrow().iter() {
                convert(child, doc, parent);
            }
        }
        _ => convert(handle, doc, parent),
    }
}

/// Copy an rcdom subtree into the arena under `parent`
fn convert(handle: &Handle, doc: &mut Document, parent: NodeId) {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let id = doc.create_element(&name.local);
            for attr in attrs.borrow().iter() {
                doc.set_attribute(id, &attr.name.local, &attr.value);
            }
            doc.append_child(parent, id);
            for child in handle.children.borrow().iter() {
                convert(child, doc, id);
            }
        }
        NodeData::Text { contents } => {
            let id = doc.create_text(&contents.borrow());
            doc.append_child(parent, id);
        }
        NodeData::Comment { contents } => {
            let id = doc.create_comment(contents);
            doc.append_child(parent, id);
        }
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                convert(child, doc, parent);
            }
        }
        NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_self_closing() {
        assert_eq!(
            convert_self_closing_custom_elements("<ao-button />"),
            "<ao-button></ao-button>"
        );
        assert_eq!(
            convert_self_closing_custom_elements("<ao-card title=\"x\"/>"),
            "<ao-card title=\"x\"></ao-card>"
        );
        assert_eq!(convert_self_closing_custom_elements("<br />"), "<br />");
    }

    #[test]
    fn test_wrappers_are_flattened() {
        let doc = parse_html("<style>p { color: red; }</style><p>hi</p>").unwrap();
        assert_eq!(doc.to_html(), "<style>p { color: red; }</style><p>hi</p>");
    }

    #[test]
    fn test_table_parts_parse_at_top_level() {
        let doc = parse_html(r#"<tr *for="r of rows"><td>{{ r }}</td></tr>"#).unwrap();
        assert_eq!(doc.children(doc.root()).len(), 1);
        let tr = doc.find_by_tag("tr")[0];
        assert_eq!(doc.parent(tr), Some(doc.root()));
        assert_eq!(doc.attribute(tr, "*for"), Some("r of rows"));
        assert_eq!(doc.text_content(doc.find_by_tag("td")[0]), "{{ r }}");
    }

    #[test]
    fn test_style_before_table_row() {
        let doc = parse_html("<style>td { color: red; }</style><tr><td>a</td></tr>").unwrap();
        assert_eq!(doc.to_html(), "<style>td { color: red; }</style><tr><td>a</td></tr>");
    }

    #[test]
    fn test_directive_and_shorthand_attributes_survive() {
        let doc = parse_html(r#"<button (click)="go()" *if="open" [count]="3">x</button>"#).unwrap();
        let button = doc.find_by_tag("button")[0];
        assert_eq!(doc.attribute(button, "(click)"), Some("go()"));
        assert_eq!(doc.attribute(button, "*if"), Some("open"));
        assert_eq!(doc.attribute(button, "[count]"), Some("3"));
    }

    #[test]
    fn test_sibling_custom_elements_do_not_nest() {
        let doc = parse_html("<div><ao-item /><span>after</span></div>").unwrap();
        let span = doc.find_by_tag("span")[0];
        let parent = doc.parent(span).unwrap();
        assert_eq!(doc.tag(parent), Some("div"));
    }
}
