//! Iteration - `<for each="..." as="..." index="..." from="...">`.
//!
//! Slots are positional. Every index present in both the previous and the
//! new list forwards `update` into its mounted instance with a fresh
//! per-item state; slot nodes are never remounted while the slot exists.
//! Grown indices mount fresh instances before the marker, shrunk indices
//! detach exactly their own nodes.
//!
//! There is no key function: removing a middle item shifts every later
//! item into the previous slot's instance, so slot-to-item pairing follows
//! position, not item identity.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::insert_before;
use crate::expr::Getter;
use crate::registry::Registry;
use crate::render::{Rendered, Template};
use crate::value::Value;

use super::resolve_template;

/// Build a list generator. `content` is the compiled child markup, used
/// per item unless `from` resolves to a template. Per-item state is the
/// surrounding state's fields plus `parent` (the surrounding state),
/// `<as_name>` (the item) and `<index_name>` (the position).
pub fn list(
    registry: &Rc<Registry>,
    content: Template,
    each: Option<Getter>,
    as_name: String,
    index_name: String,
    from: Option<Getter>,
) -> Template {
    let registry = Rc::downgrade(registry);
    Template::new(move |doc, state, dispatch| {
        let marker = doc.create_marker();
        let content = content.clone();
        let each = each.clone();
        let from = from.clone();
        let as_name = as_name.clone();
        let index_name = index_name.clone();
        let registry = registry.clone();
        let doc = doc.clone();
        let dispatch = dispatch.clone();

        let output = Rc::new(RefCell::new(vec![marker.clone()]));
        let out_handle = output.clone();

        let mut instances: Vec<Rendered> = Vec::new();

        let mut update = move |new_state: &Value| {
            if marker.parent().is_none() {
                instances.clear();
                return;
            }

            let new_items: Vec<Value> = match each.as_ref().map(|getter| getter.eval(new_state)) {
                Some(Value::List(list)) => (*list).clone(),
                _ => Vec::new(),
            };
            let item_template = from
                .as_ref()
                .and_then(|getter| resolve_template(&registry, &getter.eval(new_state)))
                .unwrap_or_else(|| content.clone());
            let item_state = |index: usize, item: &Value| {
                new_state.extended([
                    ("parent".to_string(), new_state.clone()),
                    (as_name.clone(), item.clone()),
                    (index_name.clone(), Value::Number(index as f64)),
                ])
            };

            let shared = instances.len().min(new_items.len());
            for index in 0..shared {
                instances[index].update(&item_state(index, &new_items[index]));
            }

            for index in shared..new_items.len() {
                let fresh =
                    item_template.render(&doc, &item_state(index, &new_items[index]), &dispatch);
                for node in fresh.output() {
                    insert_before(&node, &marker);
                }
                instances.push(fresh);
            }

            for removed in instances.drain(new_items.len()..) {
                removed.detach_output();
            }

            let mut nodes: Vec<_> = instances.iter().flat_map(|slot| slot.output()).collect();
            nodes.push(marker.clone());
            *out_handle.borrow_mut() = nodes;
        };
        update(state);

        Rendered::from_parts(output, Box::new(update))
    })
}
