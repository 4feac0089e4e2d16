//! # verglas
//!
//! Incremental document templating engine.
//!
//! Templates are markup with `${expression}` placeholders and a small set
//! of structural directives (`if`, `unless`, `for`, `view`, `yield`).
//! Compilation turns the markup into a tree of generator closures; the
//! first render materializes real nodes once, and every later state
//! change flows through `update(new_state)`, mutating exactly the text,
//! attributes and subtrees whose bindings it feeds. There is no virtual
//! tree and no diffing - each generator already knows the nodes it owns.
//!
//! ```text
//! source → compile (markup + ${..} + expressions) → Template
//! Template.render(doc, state, dispatch) → Rendered { output, update }
//! ```
//!
//! Expressions are sandboxed: they read state fields, call the injected
//! `sanitize`, and inside `on-` actions call `dispatch`; anything
//! unresolvable evaluates to `Undefined` and renders as nothing.
//!
//! ## Modules
//!
//! - [`compile`] - markup parsing and generator construction
//! - [`expr`] - the expression sandbox (`Getter`, `Action`)
//! - [`directives`] - conditional, iteration, transclusion
//! - [`registry`] - named templates, custom tags, attribute handlers
//! - [`fetch`] - asynchronously loaded templates
//! - [`mount`] - attaching templates to a host tree and a state store
//! - [`dom`] - the node tree the engine renders into

pub mod binder;
pub mod compile;
pub mod directives;
pub mod dom;
pub mod error;
pub mod expr;
pub mod fetch;
pub mod mount;
pub mod registry;
pub mod render;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use binder::AttrPart;
pub use compile::compile;
pub use dom::{detach, insert_before, Document, Listener, NodeRef};
pub use error::TemplateError;
pub use expr::{sanitize, Action, Getter};
pub use fetch::{AsyncTemplate, FetchHandle};
pub use mount::{append, append_named, connect, FrameScheduler, Store, UpdateHandle};
pub use registry::{AttributeHandler, Registry, TagHandler, TagProps};
pub use render::{concatenate, noop_dispatch, Dispatch, Rendered, Template};
pub use value::Value;
