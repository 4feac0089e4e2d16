//! Conditional mounting - `<if cond="...">` and `<unless cond="...">`.
//!
//! The branch is a state machine on the cached boolean: unchanged
//! condition forwards the update into the mounted content (or does
//! nothing while unmounted); a flipped condition detaches the old
//! instance and mounts a fresh one at the marker. Toggling therefore
//! remounts rather than reviving node state.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::insert_before;
use crate::expr::Getter;
use crate::render::{Rendered, Template};
use crate::value::Value;

/// Build a conditional generator over `content`. A missing condition
/// evaluates as `Undefined` (falsy). `negate` flips the test (`unless`).
pub fn condition(content: Template, cond: Option<Getter>, negate: bool) -> Template {
    Template::new(move |doc, state, dispatch| {
        let marker = doc.create_marker();
        let content = content.clone();
        let cond = cond.clone();
        let doc = doc.clone();
        let dispatch = dispatch.clone();

        let output = Rc::new(RefCell::new(vec![marker.clone()]));
        let out_handle = output.clone();

        let mut shown: Option<bool> = None;
        let mut instance: Option<Rendered> = None;

        let mut update = move |new_state: &Value| {
            if marker.parent().is_none() {
                // An enclosing directive detached this branch wholesale;
                // forget the instance so nothing dangles.
                shown = None;
                instance = None;
                return;
            }

            let truthy = cond
                .as_ref()
                .map(|getter| getter.eval(new_state).is_truthy())
                .unwrap_or(false);
            let value = truthy != negate;

            if shown == Some(value) {
                if let Some(mounted) = instance.as_mut() {
                    mounted.update(new_state);
                }
                return;
            }

            if value {
                let fresh = content.render(&doc, new_state, &dispatch);
                for node in fresh.output() {
                    insert_before(&node, &marker);
                }
                let mut nodes = fresh.output();
                nodes.push(marker.clone());
                *out_handle.borrow_mut() = nodes;
                instance = Some(fresh);
            } else {
                if let Some(old) = instance.take() {
                    old.detach_output();
                }
                *out_handle.borrow_mut() = vec![marker.clone()];
            }
            shown = Some(value);
        };
        update(state);

        Rendered::from_parts(output, Box::new(update))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile;
    use crate::dom::Document;
    use crate::registry::Registry;
    use crate::render::noop_dispatch;
    use crate::testing::render_to_string;
    use crate::value::Value;
    use serde_json::json;

    fn state(json: serde_json::Value) -> Value {
        Value::from_json(json)
    }

    fn mount(source: &str, initial: &Value) -> (crate::dom::NodeRef, Rendered) {
        let registry = Registry::new();
        let template = compile(&registry, source, None).unwrap();
        let doc = Document::new();
        let rendered = template.render(&doc, initial, &noop_dispatch());
        let root = doc.create_element("div");
        for node in rendered.output() {
            root.append_child(&node);
        }
        (root, rendered)
    }

    #[test]
    fn test_false_condition_renders_nothing_but_the_marker() {
        let (root, _rendered) = mount(
            r#"<if cond="show"><p>hi</p></if>"#,
            &state(json!({"show": false})),
        );
        assert_eq!(render_to_string(&root.children()), "");
    }

    #[test]
    fn test_toggle_mounts_and_unmounts_at_the_anchor() {
        let (root, mut rendered) = mount(
            r#"<b>a</b><if cond="show"><p>mid</p></if><b>z</b>"#,
            &state(json!({"show": false})),
        );
        assert_eq!(render_to_string(&root.children()), "<b>a</b><b>z</b>");

        rendered.update(&state(json!({"show": true})));
        assert_eq!(
            render_to_string(&root.children()),
            "<b>a</b><p>mid</p><b>z</b>"
        );

        rendered.update(&state(json!({"show": false})));
        assert_eq!(render_to_string(&root.children()), "<b>a</b><b>z</b>");
    }

    #[test]
    fn test_toggle_remounts_fresh_nodes() {
        let (root, mut rendered) = mount(
            r#"<if cond="show"><p>x</p></if>"#,
            &state(json!({"show": true})),
        );
        let find_p = |root: &crate::dom::NodeRef| {
            root.children()
                .into_iter()
                .find(|n| n.tag() == Some("p"))
                .unwrap()
        };
        let first = find_p(&root);

        rendered.update(&state(json!({"show": false})));
        rendered.update(&state(json!({"show": true})));
        let second = find_p(&root);
        assert!(!first.same(&second));
    }

    #[test]
    fn test_unchanged_condition_forwards_updates_inward() {
        let (root, mut rendered) = mount(
            r#"<if cond="show"><p>${label}</p></if>"#,
            &state(json!({"show": true, "label": "one"})),
        );
        let p = root
            .children()
            .into_iter()
            .find(|n| n.tag() == Some("p"))
            .unwrap();

        rendered.update(&state(json!({"show": true, "label": "two"})));
        assert_eq!(p.text_content(), "two");
        // Same node: updated in place, not remounted.
        assert!(root.children().iter().any(|n| n.same(&p)));
    }

    #[test]
    fn test_unless_inverts() {
        let (root, mut rendered) = mount(
            r#"<unless cond="busy"><p>ready</p></unless>"#,
            &state(json!({"busy": false})),
        );
        assert_eq!(render_to_string(&root.children()), "<p>ready</p>");

        rendered.update(&state(json!({"busy": true})));
        assert_eq!(render_to_string(&root.children()), "");
    }

    #[test]
    fn test_detached_marker_resets_without_panic() {
        let (_root, mut rendered) = mount(
            r#"<if cond="show"><p>x</p></if>"#,
            &state(json!({"show": true})),
        );
        rendered.detach_output();
        // Both flips run against the detached marker; neither may touch
        // nodes or panic.
        rendered.update(&state(json!({"show": false})));
        rendered.update(&state(json!({"show": true})));
    }

    #[test]
    fn test_missing_condition_attribute_is_falsy() {
        let (root, _rendered) = mount(r#"<if><p>never</p></if>"#, &state(json!({})));
        assert_eq!(render_to_string(&root.children()), "");
    }
}
