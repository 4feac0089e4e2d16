//! Structural directives - the generators that add and remove nodes.
//!
//! Every structural directive anchors itself with a marker node (an empty
//! text node) that stays in the tree for the instance's whole life.
//! Mounting inserts before the marker, unmounting detaches the mounted
//! nodes and leaves the marker, so position survives any number of
//! swaps. A directive that finds its own marker detached resets to
//! uninitialized instead of touching nodes it no longer owns.

mod condition;
mod list;
mod transclude;

pub use condition::condition;
pub use list::list;
pub use transclude::{transclude, yield_target};

use std::rc::Weak;

use crate::registry::Registry;
use crate::render::Template;
use crate::value::Value;

/// Resolve a directive's template reference: either a template value
/// carried in the state, or a name looked up in the registry. An unknown
/// name logs a warning and resolves to nothing.
pub(crate) fn resolve_template(registry: &Weak<Registry>, value: &Value) -> Option<Template> {
    match value {
        Value::Template(template) => Some(template.clone()),
        Value::String(name) => {
            let found = registry.upgrade().and_then(|r| r.get(name));
            if found.is_none() {
                tracing::warn!(template = %name, "template name did not resolve");
            }
            found
        }
        _ => None,
    }
}
