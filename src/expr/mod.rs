//! Expression sandbox - compiled, safely-evaluatable state expressions.
//!
//! An expression string compiles once (at template compile time) into a
//! [`Getter`]: a pure `state -> value` function tagged with its source
//! text. Evaluation resolves bare identifiers against the state's fields
//! first, exposes exactly one injected capability - [`sanitize`] - in
//! every scope regardless of state contents, and degrades every failure
//! to [`Value::Undefined`] instead of propagating it.
//!
//! [`Action`] is the same machinery for `on-` event bindings, with two
//! extra names in scope: `event` (the payload) and `dispatch` (callable,
//! forwards the argument out of the tree).

mod ast;
mod eval;
mod parser;

use std::rc::Rc;

use crate::error::TemplateError;
use crate::render::Dispatch;
use crate::value::Value;

use ast::Expr;
use eval::{eval, EvalContext};

/// HTML-escape a string: `&`, `<`, `>`, `"` and `'`.
///
/// Injected into every expression scope under the name `sanitize`.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

// =============================================================================
// Getter
// =============================================================================

/// A compiled expression evaluator: pure, reusable, never throws.
#[derive(Clone)]
pub struct Getter {
    expression: Rc<str>,
    expr: Rc<Expr>,
}

impl Getter {
    /// Compile an expression string. Parse failures are compile errors;
    /// evaluation failures later are not.
    pub fn compile(expression: &str) -> Result<Getter, TemplateError> {
        let expr = parser::parse_expression(expression).map_err(|message| {
            TemplateError::Expression {
                expression: expression.to_string(),
                message,
            }
        })?;
        Ok(Getter {
            expression: expression.into(),
            expr: Rc::new(expr),
        })
    }

    /// The source expression text (used by the flag-list attribute
    /// handler's trailing-segment rule).
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Evaluate against a state. Unresolvable or failing evaluation
    /// yields `Undefined`, never an error.
    pub fn eval(&self, state: &Value) -> Value {
        eval(&self.expr, &EvalContext::getter(state))
    }
}

impl std::fmt::Debug for Getter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Getter({:?})", self.expression)
    }
}

// =============================================================================
// Action
// =============================================================================

/// A compiled inline event action (the body of an `on-*` attribute).
#[derive(Clone)]
pub struct Action {
    expression: Rc<str>,
    expr: Rc<Expr>,
}

impl Action {
    /// Compile an action body.
    pub fn compile(expression: &str) -> Result<Action, TemplateError> {
        let getter = Getter::compile(expression)?;
        Ok(Action {
            expression: getter.expression,
            expr: getter.expr,
        })
    }

    /// The action's source text.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Run the action with the current state, the event payload and the
    /// outgoing dispatch. The result value is discarded; actions exist
    /// for their `dispatch(...)` calls.
    pub fn run(&self, state: &Value, event: &Value, dispatch: &Dispatch) {
        let ctx = EvalContext {
            state,
            event: Some(event),
            dispatch: Some(dispatch),
        };
        let _ = eval(&self.expr, &ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    fn state(json: serde_json::Value) -> Value {
        Value::from_json(json)
    }

    #[test]
    fn test_bare_identifier_reads_state_field() {
        let getter = Getter::compile("name").unwrap();
        assert_eq!(
            getter.eval(&state(json!({"name": "World"}))),
            Value::from("World")
        );
    }

    #[test]
    fn test_missing_field_is_undefined_not_an_error() {
        let getter = Getter::compile("missing").unwrap();
        assert!(getter.eval(&state(json!({}))).is_undefined());
        assert!(getter.eval(&Value::Null).is_undefined());
    }

    #[test]
    fn test_member_chain_degrades_to_undefined() {
        let getter = Getter::compile("a.b.c").unwrap();
        assert!(getter.eval(&state(json!({}))).is_undefined());
        assert!(getter.eval(&state(json!({"a": 1}))).is_undefined());
        assert_eq!(
            getter.eval(&state(json!({"a": {"b": {"c": 3}}}))),
            Value::Number(3.0)
        );
    }

    #[test]
    fn test_sanitize_is_always_in_scope() {
        let getter = Getter::compile("sanitize(html)").unwrap();
        assert_eq!(
            getter.eval(&state(json!({"html": "<b>"}))),
            Value::from("&lt;b&gt;")
        );
        // Even when the state is empty.
        let getter = Getter::compile("sanitize('<i>')").unwrap();
        assert_eq!(getter.eval(&state(json!({}))), Value::from("&lt;i&gt;"));
    }

    #[test]
    fn test_calling_a_non_capability_is_undefined() {
        let getter = Getter::compile("explode(1)").unwrap();
        assert!(getter.eval(&state(json!({"explode": 7}))).is_undefined());
    }

    #[test]
    fn test_dispatch_is_not_available_to_getters() {
        // Getters are pure; `dispatch` only exists inside actions.
        let getter = Getter::compile("dispatch('boom')").unwrap();
        assert!(getter.eval(&state(json!({}))).is_undefined());
    }

    #[test]
    fn test_arithmetic_and_comparisons() {
        let s = state(json!({"count": 3, "limit": 10}));
        assert_eq!(
            Getter::compile("count + 1").unwrap().eval(&s),
            Value::Number(4.0)
        );
        assert_eq!(
            Getter::compile("count < limit").unwrap().eval(&s),
            Value::Bool(true)
        );
        assert_eq!(
            Getter::compile("count == 3").unwrap().eval(&s),
            Value::Bool(true)
        );
        // Nonsense arithmetic degrades instead of erroring.
        assert!(Getter::compile("count * missing").unwrap().eval(&s).is_undefined());
    }

    #[test]
    fn test_string_concatenation() {
        let s = state(json!({"name": "Ada"}));
        assert_eq!(
            Getter::compile("'Hello, ' + name").unwrap().eval(&s),
            Value::from("Hello, Ada")
        );
    }

    #[test]
    fn test_ternary_and_logic() {
        let s = state(json!({"on": true, "label": "yes"}));
        assert_eq!(
            Getter::compile("on ? label : 'no'").unwrap().eval(&s),
            Value::from("yes")
        );
        assert_eq!(
            Getter::compile("on && label").unwrap().eval(&s),
            Value::from("yes")
        );
        assert_eq!(
            Getter::compile("missing || 'fallback'").unwrap().eval(&s),
            Value::from("fallback")
        );
    }

    #[test]
    fn test_list_and_map_literals_and_length() {
        let s = state(json!({"items": ["a", "b"]}));
        assert_eq!(
            Getter::compile("items.length").unwrap().eval(&s),
            Value::Number(2.0)
        );
        assert_eq!(
            Getter::compile("[1, 2][1]").unwrap().eval(&s),
            Value::Number(2.0)
        );
        assert_eq!(
            Getter::compile("{x: 1}.x").unwrap().eval(&s),
            Value::Number(1.0)
        );
    }

    #[test]
    fn test_getter_cannot_mutate_state() {
        let s = state(json!({"x": 1}));
        let getter = Getter::compile("{y: 2}").unwrap();
        let _ = getter.eval(&s);
        assert!(s.lookup("y").is_none());
        assert_eq!(s.field("x"), Value::Number(1.0));
    }

    #[test]
    fn test_compile_error_carries_expression() {
        match Getter::compile("a +") {
            Err(TemplateError::Expression { expression, .. }) => assert_eq!(expression, "a +"),
            other => panic!("expected expression error, got {other:?}"),
        }
    }

    #[test]
    fn test_action_sees_event_state_and_dispatch() {
        let seen: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let dispatch: Dispatch = Rc::new(move |intent| seen_clone.borrow_mut().push(intent));

        let action = Action::compile("dispatch({kind: kind, key: event})").unwrap();
        action.run(
            &state(json!({"kind": "press"})),
            &Value::from("Enter"),
            &dispatch,
        );

        let intents = seen.borrow();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].field("kind"), Value::from("press"));
        assert_eq!(intents[0].field("key"), Value::from("Enter"));
    }

    #[test]
    fn test_state_fields_shadow_action_parameters() {
        // A state field named `event` wins over the event binding,
        // matching scope order: state first.
        let seen: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let dispatch: Dispatch = Rc::new(move |intent| seen_clone.borrow_mut().push(intent));

        let action = Action::compile("dispatch(event)").unwrap();
        action.run(
            &state(json!({"event": "from-state"})),
            &Value::from("payload"),
            &dispatch,
        );
        assert_eq!(seen.borrow()[0], Value::from("from-state"));
    }

    #[test]
    fn test_sanitize_escapes() {
        assert_eq!(sanitize("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
        assert_eq!(sanitize("plain"), "plain");
    }
}
