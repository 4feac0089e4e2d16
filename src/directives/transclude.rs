//! Transclusion - `<view template="..." state="...">` and `<yield/>`.
//!
//! `view` mounts another template at its marker: the target comes from an
//! expression that yields either a template value or a registry name. The
//! mounted instance's state is the `state` expression's result (the whole
//! state when absent), extended with the view's own compiled children
//! under a reserved key so a `<yield/>` inside the target can splice them
//! back in. Target identity is checked on every update: same template
//! forwards the update, a different one remounts.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::insert_before;
use crate::expr::Getter;
use crate::registry::Registry;
use crate::render::{Rendered, Template};
use crate::value::Value;

use super::resolve_template;

/// State key carrying the caller's child content into the target.
pub(crate) const YIELD_KEY: &str = "_yielded_template_";

/// Build a `view` generator.
pub fn transclude(
    registry: &Rc<Registry>,
    content: Template,
    template: Option<Getter>,
    state: Option<Getter>,
) -> Template {
    let registry = Rc::downgrade(registry);
    Template::new(move |doc, initial, dispatch| {
        let marker = doc.create_marker();
        let content = content.clone();
        let template_getter = template.clone();
        let state_getter = state.clone();
        let registry = registry.clone();
        let doc = doc.clone();
        let dispatch = dispatch.clone();

        let output = Rc::new(RefCell::new(vec![marker.clone()]));
        let out_handle = output.clone();

        let mut current: Option<(Template, Rendered)> = None;

        let mut update = move |new_state: &Value| {
            if marker.parent().is_none() {
                current = None;
                return;
            }

            let adjusted = match &state_getter {
                Some(getter) => getter.eval(new_state),
                None => new_state.clone(),
            };
            let adjusted = adjusted.extended([(
                YIELD_KEY.to_string(),
                Value::Template(content.clone()),
            )]);

            let target = template_getter
                .as_ref()
                .and_then(|getter| resolve_template(&registry, &getter.eval(&adjusted)));

            let unchanged = match (&current, &target) {
                (Some((mounted, _)), Some(next)) => mounted.same(next),
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                if let Some((_, instance)) = current.as_mut() {
                    instance.update(&adjusted);
                }
                return;
            }

            if let Some((_, old)) = current.take() {
                old.detach_output();
            }
            if let Some(next) = target {
                let instance = next.render(&doc, &adjusted, &dispatch);
                for node in instance.output() {
                    insert_before(&node, &marker);
                }
                current = Some((next, instance));
            }

            let mut nodes: Vec<_> = current
                .as_ref()
                .map(|(_, instance)| instance.output())
                .unwrap_or_default();
            nodes.push(marker.clone());
            *out_handle.borrow_mut() = nodes;
        };
        update(initial);

        Rendered::from_parts(output, Box::new(update))
    })
}

/// Build a `yield` generator: mounts the carried child content once, with
/// the reserved key stripped from the state it sees.
pub fn yield_target() -> Template {
    Template::new(|doc, state, dispatch| {
        match state.lookup(YIELD_KEY) {
            Some(Value::Template(target)) => {
                let mut instance = target.render(doc, &state.without(YIELD_KEY), dispatch);
                let output = instance.output_handle();
                Rendered::from_parts(
                    output,
                    Box::new(move |new_state| instance.update(&new_state.without(YIELD_KEY))),
                )
            }
            _ => Rendered::empty(),
        }
    })
}
