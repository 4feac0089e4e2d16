//! Render protocol - the contract every generator obeys.
//!
//! A [`Template`] is called exactly once per mount point with
//! `(document, initial state, dispatch)` and returns a [`Rendered`]: the
//! live output nodes plus an `update` entry point. All later renders go
//! through `update(new_state)`; the template function itself is never
//! re-invoked for that instance.
//!
//! [`concatenate`] combines generators: outputs flatten in order, updates
//! broadcast in the same order, unconditionally - the engine does no deep
//! equality checks, per-field getters are cheap enough to just re-run.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::dom::{detach, Document, NodeRef};
use crate::value::Value;

/// Opaque conduit for outgoing intents. Threaded through from the mount
/// point to every leaf; never inspected by the engine.
pub type Dispatch = Rc<dyn Fn(Value)>;

/// A dispatch that drops every intent, for mounts that do not wire one up.
pub fn noop_dispatch() -> Dispatch {
    Rc::new(|_| {})
}

// =============================================================================
// Rendered instances
// =============================================================================

/// A mounted template instance: its current top-level nodes and the
/// function that brings them up to date with a new state.
///
/// `output` is shared behind an `Rc` because some generators (the async
/// loader) replace their own output in place after mounting; holders of a
/// `Rendered` always observe the *current* node set.
pub struct Rendered {
    output: Rc<RefCell<Vec<NodeRef>>>,
    update: Box<dyn FnMut(&Value)>,
}

impl Rendered {
    /// Build an instance from its initial nodes and update function.
    pub fn new(output: Vec<NodeRef>, update: Box<dyn FnMut(&Value)>) -> Rendered {
        Rendered {
            output: Rc::new(RefCell::new(output)),
            update,
        }
    }

    /// The empty instance: no nodes, updates do nothing.
    pub fn empty() -> Rendered {
        Rendered::new(Vec::new(), Box::new(|_| {}))
    }

    /// Build an instance around an already-shared output handle, for
    /// generators whose update function rewrites their own output set.
    pub(crate) fn from_parts(
        output: Rc<RefCell<Vec<NodeRef>>>,
        update: Box<dyn FnMut(&Value)>,
    ) -> Rendered {
        Rendered { output, update }
    }

    /// Snapshot of the instance's current top-level nodes.
    pub fn output(&self) -> Vec<NodeRef> {
        self.output.borrow().clone()
    }

    /// Shared handle to the output set, for generators that must swap
    /// their own nodes after mounting.
    pub(crate) fn output_handle(&self) -> Rc<RefCell<Vec<NodeRef>>> {
        self.output.clone()
    }

    /// Re-render against `state`, mutating the live tree in place.
    pub fn update(&mut self, state: &Value) {
        (self.update)(state);
    }

    /// Detach every current output node from the document.
    pub fn detach_output(&self) {
        for node in self.output.borrow().iter() {
            detach(node);
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// A compiled, reusable render function. Cheap to clone; clones share the
/// compiled generator tree and compare equal under [`Template::same`].
#[derive(Clone)]
pub struct Template {
    render: Rc<dyn Fn(&Document, &Value, &Dispatch) -> Rendered>,
}

impl Template {
    /// Wrap a generator function as a template.
    pub fn new(render: impl Fn(&Document, &Value, &Dispatch) -> Rendered + 'static) -> Template {
        Template {
            render: Rc::new(render),
        }
    }

    /// The template that renders nothing.
    pub fn nop() -> Template {
        Template::new(|_, _, _| Rendered::empty())
    }

    /// Mount one instance of this template.
    pub fn render(&self, doc: &Document, state: &Value, dispatch: &Dispatch) -> Rendered {
        (self.render)(doc, state, dispatch)
    }

    /// Template identity - shared compiled tree.
    pub fn same(&self, other: &Template) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Template({:p})", Rc::as_ptr(&self.render))
    }
}

/// Combine generators into one template. Output is the flattened
/// concatenation of the children's outputs in call order; `update`
/// broadcasts to every child in that same order.
pub fn concatenate(templates: Vec<Template>) -> Template {
    Template::new(move |doc, state, dispatch| {
        let mut nodes = Vec::new();
        let mut parts: Vec<Rendered> = Vec::with_capacity(templates.len());
        for template in &templates {
            let part = template.render(doc, state, dispatch);
            nodes.extend(part.output());
            parts.push(part);
        }
        Rendered::new(
            nodes,
            Box::new(move |state| {
                for part in parts.iter_mut() {
                    part.update(state);
                }
            }),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_template(text: &str) -> Template {
        let text = text.to_string();
        Template::new(move |doc, _, _| {
            Rendered::new(vec![doc.create_text_node(&text)], Box::new(|_| {}))
        })
    }

    #[test]
    fn test_concatenate_flattens_output_in_order() {
        let combined = concatenate(vec![
            text_template("a"),
            text_template("b"),
            text_template("c"),
        ]);
        let doc = Document::new();
        let rendered = combined.render(&doc, &Value::Null, &noop_dispatch());

        let texts: Vec<String> = rendered.output().iter().map(|n| n.text()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_concatenate_broadcasts_updates() {
        use std::cell::RefCell;

        let order: Rc<RefCell<Vec<u8>>> = Rc::new(RefCell::new(Vec::new()));
        let make = |id: u8, order: Rc<RefCell<Vec<u8>>>| {
            Template::new(move |_, _, _| {
                let order = order.clone();
                Rendered::new(
                    Vec::new(),
                    Box::new(move |_| order.borrow_mut().push(id)),
                )
            })
        };

        let combined = concatenate(vec![make(1, order.clone()), make(2, order.clone())]);
        let mut rendered = combined.render(&Document::new(), &Value::Null, &noop_dispatch());

        rendered.update(&Value::Null);
        rendered.update(&Value::Null);
        assert_eq!(*order.borrow(), vec![1, 2, 1, 2]);
    }

    #[test]
    fn test_template_identity() {
        let a = text_template("x");
        let b = text_template("x");
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }

    #[test]
    fn test_nop_renders_nothing() {
        let mut rendered = Template::nop().render(&Document::new(), &Value::Null, &noop_dispatch());
        assert!(rendered.output().is_empty());
        rendered.update(&Value::Null);
    }
}
