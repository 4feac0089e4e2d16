//! Attribute binder - tokenized attribute values and their application.
//!
//! Attribute values compile once into literal/getter parts. On every
//! update the element generator re-applies each attribute: the registry's
//! attribute-handler table is consulted first (by attribute name), and
//! plain attributes fall back to part concatenation with `Undefined` and
//! `Null` rendering empty.
//!
//! The stock `class` handler treats the attribute as a flag list: a getter
//! that evaluates to `true` contributes the trailing segment of its own
//! expression text (everything after the first `.`), falsy contributes
//! nothing, and any other truthy value contributes its display string.

use std::rc::Weak;

use crate::compile::literal::{tokenize, Segment};
use crate::dom::NodeRef;
use crate::error::TemplateError;
use crate::expr::Getter;
use crate::registry::Registry;
use crate::value::Value;

/// One compiled piece of an attribute value.
#[derive(Debug, Clone)]
pub enum AttrPart {
    Literal(String),
    Getter(Getter),
}

/// Compile a raw attribute value into parts.
pub fn compile_attribute(value: &str) -> Result<Vec<AttrPart>, TemplateError> {
    tokenize(value)?
        .into_iter()
        .map(|segment| match segment {
            Segment::Text(literal) => Ok(AttrPart::Literal(literal)),
            Segment::Expr(expression) => Getter::compile(&expression).map(AttrPart::Getter),
        })
        .collect()
}

/// Apply one attribute to an element for the given state, routing through
/// the registry's handler table when a handler is registered for the name.
pub fn apply_attribute(
    registry: &Weak<Registry>,
    el: &NodeRef,
    name: &str,
    parts: &[AttrPart],
    state: &Value,
) {
    if let Some(handler) = registry.upgrade().and_then(|r| r.attribute_handler(name)) {
        handler(el, state, parts);
        return;
    }
    el.set_attribute(name, &render_parts(parts, state));
}

/// Plain concatenation of parts.
pub fn render_parts(parts: &[AttrPart], state: &Value) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            AttrPart::Literal(literal) => out.push_str(literal),
            AttrPart::Getter(getter) => out.push_str(&getter.eval(state).display_string()),
        }
    }
    out
}

/// Flag-list rendering for class-like attributes.
pub fn flag_list(parts: &[AttrPart], state: &Value) -> String {
    let mut out = String::new();
    for part in parts {
        match part {
            AttrPart::Literal(literal) => out.push_str(literal),
            AttrPart::Getter(getter) => match getter.eval(state) {
                Value::Bool(true) => out.push_str(trailing_segment(getter.expression())),
                value if value.is_truthy() => out.push_str(&value.display_string()),
                _ => {}
            },
        }
    }
    out.trim().to_string()
}

/// Everything after the first `.` of an expression, or the whole
/// expression when it has none. `${menu.open}` contributes "open".
fn trailing_segment(expression: &str) -> &str {
    match expression.split_once('.') {
        Some((_, rest)) => rest,
        None => expression,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(json: serde_json::Value) -> Value {
        Value::from_json(json)
    }

    fn parts(value: &str) -> Vec<AttrPart> {
        compile_attribute(value).unwrap()
    }

    #[test]
    fn test_plain_parts_concatenate() {
        let s = state(json!({"id": 7}));
        assert_eq!(render_parts(&parts("item-${id}"), &s), "item-7");
    }

    #[test]
    fn test_undefined_and_null_render_empty() {
        let s = state(json!({"n": null}));
        assert_eq!(render_parts(&parts("a${missing}b${n}c"), &s), "abc");
    }

    #[test]
    fn test_flag_list_true_uses_trailing_expression_segment() {
        let s = state(json!({"menu": {"open": true}}));
        assert_eq!(flag_list(&parts("menu ${menu.open}"), &s), "menu open");
    }

    #[test]
    fn test_flag_list_undotted_expression_uses_itself() {
        let s = state(json!({"active": true}));
        assert_eq!(flag_list(&parts("${active}"), &s), "active");
    }

    #[test]
    fn test_flag_list_falsy_contributes_nothing_and_trims() {
        let s = state(json!({"menu": {"open": false}}));
        assert_eq!(flag_list(&parts("menu ${menu.open}"), &s), "menu");
        assert_eq!(flag_list(&parts("${menu.open}"), &s), "");
    }

    #[test]
    fn test_flag_list_mixed_parts_trim_to_the_flags() {
        // g1 is true with a dotted expression, g2 is an empty string:
        // only g1's trailing segment survives, whitespace trimmed.
        let s = state(json!({"a": {"b": true}, "other": ""}));
        assert_eq!(flag_list(&parts("${a.b} ${other}"), &s), "b");
    }

    #[test]
    fn test_flag_list_other_truthy_values_display() {
        let s = state(json!({"kind": "warning"}));
        assert_eq!(flag_list(&parts("badge ${kind}"), &s), "badge warning");
    }
}
