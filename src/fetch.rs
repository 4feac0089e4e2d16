//! Asynchronous template loading.
//!
//! `Registry::fetch(url, ..)` returns an [`AsyncTemplate`]: a template
//! that is usable immediately plus a [`FetchHandle`] the host resolves
//! once it has retrieved the source (the engine performs no I/O itself).
//!
//! Until resolution, every mounted instance renders a placeholder
//! `<div class="verglas-loading"/>` and buffers the last state it was
//! updated with. `resolve` compiles the source - compile errors return to
//! the resolver's caller and leave the placeholders standing - then every
//! live instance mounts the real template with its buffered state, splices
//! it in before the placeholder and drops the placeholder. Instances
//! rendered after resolution mount the real template directly.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::dom::{detach, insert_before};
use crate::error::TemplateError;
use crate::registry::Registry;
use crate::render::{Rendered, Template};
use crate::value::Value;

const DEFAULT_PLACEHOLDER_CLASS: &str = "verglas-loading";

/// A not-yet-loaded template and the handle that completes it.
pub struct AsyncTemplate {
    pub template: Template,
    pub handle: FetchHandle,
}

enum FetchState {
    /// Waiting for the host. Each pending instance leaves a callback that
    /// swaps the placeholder for the real content.
    Pending(Vec<Box<dyn FnOnce(&Template)>>),
    Ready(Template),
    Failed(String),
}

/// Completion handle for one fetched template. Cloneable; all clones
/// complete the same pending instances.
#[derive(Clone)]
pub struct FetchHandle {
    url: Rc<str>,
    registry: Weak<Registry>,
    state: Rc<RefCell<FetchState>>,
}

impl FetchHandle {
    /// The URL this template was requested under.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// True once `resolve` has succeeded.
    pub fn is_resolved(&self) -> bool {
        matches!(&*self.state.borrow(), FetchState::Ready(_))
    }

    /// The recorded failure, if `reject` was called.
    pub fn error(&self) -> Option<String> {
        match &*self.state.borrow() {
            FetchState::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Complete the load with the fetched source. Compilation failures
    /// propagate to the caller and leave every instance pending on its
    /// placeholder; resolving twice is an error.
    pub fn resolve(&self, source: &str) -> Result<(), TemplateError> {
        let registry = self.registry.upgrade().ok_or_else(|| TemplateError::Fetch {
            url: self.url.to_string(),
            message: "registry was dropped before resolution".to_string(),
        })?;
        let template = registry.compile(source, Some(&self.url))?;

        let waiters = {
            let mut state = self.state.borrow_mut();
            match &mut *state {
                FetchState::Pending(waiters) => {
                    let waiters = std::mem::take(waiters);
                    *state = FetchState::Ready(template.clone());
                    waiters
                }
                FetchState::Ready(_) => {
                    return Err(TemplateError::Fetch {
                        url: self.url.to_string(),
                        message: "already resolved".to_string(),
                    })
                }
                FetchState::Failed(_) => {
                    // A late successful retry after reject: no waiters
                    // survive a rejection, but future mounts get the
                    // real template.
                    *state = FetchState::Ready(template.clone());
                    Vec::new()
                }
            }
        };

        tracing::debug!(url = %self.url, instances = waiters.len(), "async template resolved");
        for waiter in waiters {
            waiter(&template);
        }
        Ok(())
    }

    /// Record a load failure. Placeholders stay in the tree; pending
    /// swap callbacks are dropped.
    pub fn reject(&self, message: &str) {
        tracing::warn!(url = %self.url, message, "async template rejected");
        *self.state.borrow_mut() = FetchState::Failed(message.to_string());
    }
}

pub(crate) fn async_template(
    registry: &Rc<Registry>,
    url: &str,
    placeholder_class: Option<&str>,
) -> AsyncTemplate {
    let handle = FetchHandle {
        url: url.into(),
        registry: Rc::downgrade(registry),
        state: Rc::new(RefCell::new(FetchState::Pending(Vec::new()))),
    };
    let class = placeholder_class
        .unwrap_or(DEFAULT_PLACEHOLDER_CLASS)
        .to_string();
    let shared = handle.state.clone();

    let template = Template::new(move |doc, state, dispatch| {
        if let FetchState::Ready(real) = &*shared.borrow() {
            return real.render(doc, state, dispatch);
        }

        let placeholder = doc.create_element("div");
        placeholder.set_attribute("class", &class);
        // Parent the placeholder so splicing works even before the
        // output is adopted anywhere.
        let fragment = doc.create_fragment();
        fragment.append_child(&placeholder);

        let output = Rc::new(RefCell::new(vec![placeholder.clone()]));
        let buffered = Rc::new(RefCell::new(state.clone()));
        let mounted: Rc<RefCell<Option<Rendered>>> = Rc::new(RefCell::new(None));

        if let FetchState::Pending(waiters) = &mut *shared.borrow_mut() {
            let doc = doc.clone();
            let dispatch = dispatch.clone();
            let placeholder = placeholder.clone();
            let buffered = buffered.clone();
            let mounted = mounted.clone();
            let output = output.clone();
            waiters.push(Box::new(move |template: &Template| {
                let last = buffered.borrow().clone();
                let real = template.render(&doc, &last, &dispatch);
                for node in real.output() {
                    insert_before(&node, &placeholder);
                }
                detach(&placeholder);
                *output.borrow_mut() = real.output();
                *mounted.borrow_mut() = Some(real);
            }));
        }

        let update = move |new_state: &Value| {
            if let Some(real) = mounted.borrow_mut().as_mut() {
                real.update(new_state);
            } else {
                *buffered.borrow_mut() = new_state.clone();
            }
        };
        Rendered::from_parts(output, Box::new(update))
    });

    AsyncTemplate { template, handle }
}
