//! # Element Runtime
//!
//! Custom elements with declarative templates, a reactive state bag and
//! structural directives, rendered into an in-memory DOM.
//!
//! ## Template Language
//!
//! - `{{ expr }}`: reactive text or attribute binding. `expr` is a dotted path
//!   (`user.name`), a zero-argument call of an exposed method (`total()`), a
//!   negation (`!open`) or a literal.
//! - `[[ name ]]`: input/slot placeholder, substituted once before parsing.
//! - `*if="expr"`: toggles display; the element stays in the tree.
//! - `*for="[let] item of path"`: one clone per item, inserted before the
//!   hidden template.
//! - `(event)="method(args)"`: rewritten to `data-event` and wired as a listener.
//!   `(value)="path"` is the two-way binding.
//!
//! ## Runtime Invariants
//!
//! 1. **State/Property Consistency**: a write through [`Component::write_state`]
//!    updates the state bag and the input/slot property view before anything
//!    re-renders.
//!
//! 2. **Exposure Gate**: templates can only invoke methods registered with
//!    [`ComponentBuilder::expose`]. Everything else is refused and logged.
//!
//! 3. **Loop Cleanup**: a `*for` template's previous clones are removed before
//!    it materializes again. Clones are never diffed.
//!
//! 4. **Compiled Templates Are Immutable**: loops operate on the live tree of
//!    one instance; the cached compiled tree is only ever copied.
//!
//! 5. **Soft Failure**: malformed directives, unresolved paths and failing
//!    methods degrade to inert/empty output. Only the Rust-facing API returns
//!    errors.

pub mod assets;
pub mod cache;
pub mod compile;
pub mod component;
pub mod definition;
pub mod directives;
pub mod dom;
pub mod error;
pub mod expression;
pub mod framework;
pub mod host;
pub mod model;
pub mod parse;
pub mod render;
pub mod sync;
pub mod value;
pub mod wiring;

#[cfg(test)]
mod component_tests;

pub use assets::{discover_assets, AssetSource, Assets};
pub use compile::{compile, CompiledTemplate, TemplateSummary};
pub use component::{Component, Event, RenderStatus};
pub use definition::{
    get_exposed_methods, get_input_properties, get_slot_properties, get_state_properties,
    ComponentBuilder, ComponentDefinition, PropertySpec,
};
pub use dom::{Document, NodeId};
pub use error::{MethodError, Result, RuntimeError};
pub use framework::Framework;
pub use host::HostElement;
pub use model::Context;
pub use value::StateBag;
