//! Expression interpreter.
//!
//! Pure evaluation over a state value. The interpreter can neither mutate
//! the state nor panic: anything unresolvable - a missing field, a bad
//! operand, a call to something that is not callable - evaluates to
//! [`Value::Undefined`]. Rendering best-effort instead of crashing the
//! page on one bad binding is policy, not an accident.

use std::rc::Rc;

use crate::render::Dispatch;
use crate::value::Value;

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::sanitize;

/// Name resolution environment for one evaluation.
///
/// Bare identifiers resolve against the state map first, then the extra
/// bindings actions receive (`event`, `state`), then the injected
/// capabilities (`sanitize`, and `dispatch` inside actions).
pub(crate) struct EvalContext<'a> {
    pub state: &'a Value,
    pub event: Option<&'a Value>,
    pub dispatch: Option<&'a Dispatch>,
}

impl<'a> EvalContext<'a> {
    pub fn getter(state: &'a Value) -> EvalContext<'a> {
        EvalContext {
            state,
            event: None,
            dispatch: None,
        }
    }

    fn resolve(&self, name: &str) -> Value {
        if let Some(value) = self.state.lookup(name) {
            return value;
        }
        match name {
            "event" => self.event.cloned().unwrap_or(Value::Undefined),
            "state" => self.state.clone(),
            _ => Value::Undefined,
        }
    }
}

pub(crate) fn eval(expr: &Expr, ctx: &EvalContext) -> Value {
    match expr {
        Expr::Null => Value::Null,
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Number(n) => Value::Number(*n),
        Expr::Str(s) => Value::String(Rc::from(s.as_str())),
        Expr::List(items) => Value::List(Rc::new(
            items.iter().map(|item| eval(item, ctx)).collect(),
        )),
        Expr::Map(entries) => Value::Map(Rc::new(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), eval(value, ctx)))
                .collect(),
        )),
        Expr::Ident(name) => ctx.resolve(name),
        Expr::Member(object, name) => member(&eval(object, ctx), name),
        Expr::Index(container, index) => {
            let container = eval(container, ctx);
            match eval(index, ctx) {
                Value::Number(n) if n >= 0.0 => container.index(n as usize),
                Value::String(key) => container.field(&key),
                _ => Value::Undefined,
            }
        }
        Expr::Call(callee, args) => call(callee, args, ctx),
        Expr::Unary(op, operand) => {
            let operand = eval(operand, ctx);
            match op {
                UnaryOp::Not => Value::Bool(!operand.is_truthy()),
                UnaryOp::Neg => match operand.as_number() {
                    Some(n) => Value::Number(-n),
                    None => Value::Undefined,
                },
            }
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, lhs, rhs, ctx),
        Expr::Ternary(cond, then_branch, else_branch) => {
            if eval(cond, ctx).is_truthy() {
                eval(then_branch, ctx)
            } else {
                eval(else_branch, ctx)
            }
        }
    }
}

/// Field access, plus `length` on lists and strings.
fn member(object: &Value, name: &str) -> Value {
    if let Some(value) = object.lookup(name) {
        return value;
    }
    match (object, name) {
        (Value::List(items), "length") => Value::Number(items.len() as f64),
        (Value::String(s), "length") => Value::Number(s.chars().count() as f64),
        _ => Value::Undefined,
    }
}

/// The only callables are the injected capabilities: `sanitize` always,
/// `dispatch` when evaluating an action. Calling anything else is
/// `Undefined`.
fn call(callee: &Expr, args: &[Expr], ctx: &EvalContext) -> Value {
    if let Expr::Ident(name) = callee {
        match name.as_str() {
            "sanitize" => {
                let arg = args
                    .first()
                    .map(|a| eval(a, ctx))
                    .unwrap_or(Value::Undefined);
                return Value::String(sanitize(&arg.display_string()).into());
            }
            "dispatch" => {
                if let Some(dispatch) = ctx.dispatch {
                    let intent = args
                        .first()
                        .map(|a| eval(a, ctx))
                        .unwrap_or(Value::Undefined);
                    dispatch(intent);
                    return Value::Undefined;
                }
            }
            _ => {}
        }
    }
    Value::Undefined
}

fn binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, ctx: &EvalContext) -> Value {
    // Short-circuit logic yields the deciding operand, not a boolean.
    match op {
        BinaryOp::And => {
            let left = eval(lhs, ctx);
            return if left.is_truthy() { eval(rhs, ctx) } else { left };
        }
        BinaryOp::Or => {
            let left = eval(lhs, ctx);
            return if left.is_truthy() { left } else { eval(rhs, ctx) };
        }
        _ => {}
    }

    let left = eval(lhs, ctx);
    let right = eval(rhs, ctx);
    match op {
        BinaryOp::Eq => Value::Bool(left == right),
        BinaryOp::Ne => Value::Bool(left != right),
        BinaryOp::Lt => compare(&left, &right, |o| o.is_lt()),
        BinaryOp::Le => compare(&left, &right, |o| o.is_le()),
        BinaryOp::Gt => compare(&left, &right, |o| o.is_gt()),
        BinaryOp::Ge => compare(&left, &right, |o| o.is_ge()),
        BinaryOp::Add => add(&left, &right),
        BinaryOp::Sub => arithmetic(&left, &right, |a, b| a - b),
        BinaryOp::Mul => arithmetic(&left, &right, |a, b| a * b),
        BinaryOp::Div => arithmetic(&left, &right, |a, b| a / b),
        BinaryOp::Rem => arithmetic(&left, &right, |a, b| a % b),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

/// `+` concatenates when either side is a string, otherwise adds numbers.
fn add(left: &Value, right: &Value) -> Value {
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        return Value::String(
            format!("{}{}", left.display_string(), right.display_string()).into(),
        );
    }
    arithmetic(left, right, |a, b| a + b)
}

fn arithmetic(left: &Value, right: &Value, op: impl Fn(f64, f64) -> f64) -> Value {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Value::Number(op(a, b)),
        _ => Value::Undefined,
    }
}

fn compare(left: &Value, right: &Value, accept: impl Fn(std::cmp::Ordering) -> bool) -> Value {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    Value::Bool(ordering.map(accept).unwrap_or(false))
}
