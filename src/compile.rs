//! Template Compiler
//!
//! Compilation runs in a fixed order:
//!
//! 1. `[[ name ]]` placeholders are substituted textually, once, before parsing.
//!    They are never reactive.
//! 2. The resulting markup (stylesheet first) is parsed into a [`Document`].
//! 3. One walk over the tree attaches [`Markers`](crate::dom::Markers):
//!    - text nodes with `{{ expr }}` become text bindings; a text node that is
//!      exactly one mustache and the only child binds on its parent element,
//!      otherwise it is split into literal text and one `<span>` per mustache
//!    - attributes with `{{ expr }}` keep their raw template for re-rendering
//!      and show the literal parts as a static fallback
//!    - `(event)` shorthand becomes a plain `data-event` attribute
//!    - `*if` and `*for` are recorded and stripped; loop templates start hidden
//!
//! Compilation never evaluates expressions or calls component methods.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dom::{AttributeBinding, Document, LoopDirective, NodeId, NodeKind};
use crate::error::Result;
use crate::expression::{has_mustache, sole_mustache, split_mustaches, static_fallback, Expr, PropertyPath, Segment};
use crate::parse::parse_html;

lazy_static! {
    /// `[[ name ]]` static placeholder
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\[\[\s*([a-zA-Z0-9\-_]+)\s*\]\]").unwrap();

    /// `[let] item of collection.path`
    static ref LOOP_RE: Regex = Regex::new(
        r"^\s*(?:let\s+)?([A-Za-z_$][A-Za-z0-9_$]*)\s+of\s+([A-Za-z_$][A-Za-z0-9_$\-]*(?:\.[A-Za-z0-9_$\-]+)*)\s*$"
    ).unwrap();

    /// `(eventName)` shorthand attribute name
    static ref EVENT_ATTR_RE: Regex = Regex::new(r"^\(([A-Za-z0-9_\-:.]+)\)$").unwrap();
}

pub const IF_ATTRIBUTE: &str = "*if";
pub const FOR_ATTRIBUTE: &str = "*for";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILED TEMPLATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Binding counts, for diagnostics and tests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub text_bindings: usize,
    pub function_bindings: usize,
    pub attribute_bindings: usize,
    pub conditions: usize,
    pub loops: usize,
    pub inert_loops: usize,
    pub events: usize,
}

/// Immutable result of compilation. Instances render from a copy of `document`.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub document: Document,
    pub summary: TemplateSummary,
}

impl CompiledTemplate {
    /// A fresh, independent copy of the compiled tree
    pub fn instantiate(&self) -> Document {
        self.document.clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PLACEHOLDERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Join stylesheet and template the way they are rendered: style block first
pub fn assemble_source(template: &str, stylesheet: &str) -> String {
    if stylesheet.trim().is_empty() {
        template.to_string()
    } else {
        format!("<style>{}</style>{}", stylesheet, template)
    }
}

/// Substitute every `[[ name ]]`. Unresolved names render as nothing.
pub fn resolve_placeholders(text: &str, mut resolve: impl FnMut(&str) -> Option<String>) -> String {
    PLACEHOLDER_RE
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            match resolve(name) {
                Some(value) => value,
                None => {
                    tracing::debug!("Unresolved placeholder [[ {} ]]", name);
                    String::new()
                }
            }
        })
        .to_string()
}

/// Parse the `*for` grammar. Anything else becomes an inert loop.
pub fn parse_loop_directive(raw: &str) -> LoopDirective {
    let parsed = LOOP_RE.captures(raw).and_then(|caps| {
        let collection = PropertyPath::parse(&caps[2])?;
        Some(LoopDirective::Each {
            item: caps[1].to_string(),
            collection,
        })
    });

    parsed.unwrap_or_else(|| {
        tracing::warn!("Malformed *for expression '{}'; loop will stay inert", raw);
        LoopDirective::Inert(raw.to_string())
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Full pipeline: placeholders, then parse and mark
pub fn compile(
    template: &str,
    stylesheet: &str,
    resolve: impl FnMut(&str) -> Option<String>,
) -> Result<CompiledTemplate> {
    let resolved = resolve_placeholders(&assemble_source(template, stylesheet), resolve);
    compile_resolved(&resolved)
}

/// Parse and mark markup whose placeholders are already substituted
pub fn compile_resolved(markup: &str) -> Result<CompiledTemplate> {
    let mut document = parse_html(markup)?;
    let mut summary = TemplateSummary::default();

    for id in document.all() {
        match document.kind(id) {
            Some(NodeKind::Element(_)) => mark_element(&mut document, id, &mut summary),
            Some(NodeKind::Text(text)) if has_mustache(text) => {
                if !inside_raw_text(&document, id) {
                    let text = text.clone();
                    mark_text(&mut document, id, &text, &mut summary);
                }
            }
            _ => {}
        }
    }

    Ok(CompiledTemplate { document, summary })
}

fn inside_raw_text(doc: &Document, id: NodeId) -> bool {
    doc.parent(id)
        .and_then(|p| doc.tag(p))
        .map(|t| t.eq_ignore_ascii_case("style") || t.eq_ignore_ascii_case("script"))
        .unwrap_or(false)
}

fn count_text_binding(expr: &Expr, summary: &mut TemplateSummary) {
    if expr.is_call() {
        summary.function_bindings += 1;
    } else {
        summary.text_bindings += 1;
    }
}

fn mark_text(doc: &mut Document, id: NodeId, text: &str, summary: &mut TemplateSummary) {
    let Some(parent) = doc.parent(id) else {
        return;
    };

    let parent_is_element = doc.element(parent).is_some();
    let only_child = doc.children(parent).len() == 1;
    if parent_is_element && only_child {
        if let Some(expr) = sole_mustache(text) {
            count_text_binding(&expr, summary);
            doc.remove(id);
            if let Some(markers) = doc.markers_mut(parent) {
                markers.text = Some(expr);
            }
            return;
        }
    }

    for segment in split_mustaches(text) {
        let node = match segment {
            Segment::Literal(literal) => doc.create_text(&literal),
            Segment::Binding(expr) => {
                count_text_binding(&expr, summary);
                let span = doc.create_element("span");
                if let Some(markers) = doc.markers_mut(span) {
                    markers.text = Some(expr);
                }
                span
            }
        };
        doc.insert_before(parent, node, Some(id));
    }
    doc.remove(id);
}

fn mark_element(doc: &mut Document, id: NodeId, summary: &mut TemplateSummary) {
    let attrs = match doc.element(id) {
        Some(el) => el.attrs.clone(),
        None => return,
    };

    for (name, value) in attrs {
        if let Some(caps) = EVENT_ATTR_RE.captures(&name) {
            let event = caps[1].to_string();
            doc.remove_attribute(id, &name);
            doc.set_attribute(id, &format!("data-{}", event), &value);
            if let Some(markers) = doc.markers_mut(id) {
                markers.events.push(event);
            }
            summary.events += 1;
            continue;
        }

        if name == IF_ATTRIBUTE {
            doc.remove_attribute(id, &name);
            if let Some(markers) = doc.markers_mut(id) {
                markers.condition = Some(Expr::parse(&value));
            }
            summary.conditions += 1;
            continue;
        }

        if name == FOR_ATTRIBUTE {
            doc.remove_attribute(id, &name);
            let directive = parse_loop_directive(&value);
            if matches!(directive, LoopDirective::Inert(_)) {
                summary.inert_loops += 1;
            } else {
                summary.loops += 1;
            }
            if let Some(markers) = doc.markers_mut(id) {
                markers.repeat = Some(directive);
            }
            doc.set_hidden(id, true);
            continue;
        }

        if has_mustache(&value) {
            let segments = split_mustaches(&value);
            doc.set_attribute(id, &name, &static_fallback(&segments));
            if let Some(markers) = doc.markers_mut(id) {
                markers.attributes.push(AttributeBinding {
                    name: name.clone(),
                    template: value.clone(),
                    segments,
                });
            }
            summary.attribute_bindings += 1;
        }
    }
}
