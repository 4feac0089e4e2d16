//! Mounting - attaching templates to a host tree and a state source.
//!
//! [`append`] is the one-shot entry point: render into a parent node and
//! hand back an [`UpdateHandle`] the caller drives manually.
//! [`append_named`] does the same for a template registered by name.
//!
//! [`connect`] wires a template to a [`Store`]: every store notification
//! marks the mount stale and schedules one re-render through the host's
//! [`FrameScheduler`]; further notifications before the frame runs
//! coalesce into that single render, which reads the store's state fresh
//! at frame time.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dom::{Document, NodeRef};
use crate::registry::Registry;
use crate::render::{noop_dispatch, Dispatch, Rendered, Template};
use crate::value::Value;

/// A state container the engine can subscribe to. The engine never
/// interprets intents; `dispatch` hands them straight to the store.
pub trait Store {
    /// Current state snapshot.
    fn get_state(&self) -> Value;
    /// Register a change listener, kept for the store's lifetime.
    fn subscribe(&self, listener: Box<dyn Fn()>);
    /// Accept an intent dispatched from inside the tree.
    fn dispatch(&self, intent: Value);
}

/// Host hook for frame-aligned rendering (the browser equivalent is
/// requestAnimationFrame; tests drive it by hand).
pub trait FrameScheduler {
    fn request_frame(&self, callback: Box<dyn FnOnce()>);
}

/// Driving handle for a mounted template instance.
#[derive(Clone)]
pub struct UpdateHandle {
    rendered: Rc<RefCell<Rendered>>,
}

impl UpdateHandle {
    /// Bring the mounted tree up to date with `state`.
    pub fn update(&self, state: &Value) {
        self.rendered.borrow_mut().update(state);
    }

    /// Current top-level nodes of the mount.
    pub fn output(&self) -> Vec<NodeRef> {
        self.rendered.borrow().output()
    }
}

/// Render `template` once and append its output to `parent`. Later states
/// go through the returned handle; `dispatch` defaults to a no-op.
pub fn append(
    parent: &NodeRef,
    template: &Template,
    state: &Value,
    dispatch: Option<Dispatch>,
) -> UpdateHandle {
    let doc = Document::new();
    let dispatch = dispatch.unwrap_or_else(noop_dispatch);
    let rendered = template.render(&doc, state, &dispatch);
    for node in rendered.output() {
        parent.append_child(&node);
    }
    UpdateHandle {
        rendered: Rc::new(RefCell::new(rendered)),
    }
}

/// [`append`] for a template registered under `name`. An unregistered
/// name logs a warning and mounts nothing.
pub fn append_named(
    parent: &NodeRef,
    registry: &Rc<Registry>,
    name: &str,
    state: &Value,
    dispatch: Option<Dispatch>,
) -> Option<UpdateHandle> {
    match registry.get(name) {
        Some(template) => Some(append(parent, &template, state, dispatch)),
        None => {
            tracing::warn!(template = %name, "mount name did not resolve");
            None
        }
    }
}

/// Mount `template` under `parent`, driven by `store`. Intents dispatched
/// inside the tree go to `store.dispatch`; state changes re-render at
/// most once per scheduled frame.
pub fn connect(
    parent: &NodeRef,
    template: &Template,
    store: Rc<dyn Store>,
    scheduler: Rc<dyn FrameScheduler>,
) -> UpdateHandle {
    let dispatch: Dispatch = {
        let store = store.clone();
        Rc::new(move |intent| store.dispatch(intent))
    };
    let handle = append(parent, template, &store.get_state(), Some(dispatch));

    let stale = Rc::new(Cell::new(false));
    {
        let handle = handle.clone();
        let subscriber = store.clone();
        let store = store.clone();
        let stale = stale.clone();
        let scheduler = scheduler.clone();
        subscriber.subscribe(Box::new(move || {
            if stale.get() {
                return;
            }
            stale.set(true);
            let handle = handle.clone();
            let store = store.clone();
            let stale = stale.clone();
            scheduler.request_frame(Box::new(move || {
                handle.update(&store.get_state());
                stale.set(false);
            }));
        }));
    }
    handle
}
