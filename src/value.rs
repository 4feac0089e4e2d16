//! Dynamic state values.
//!
//! Templates are rendered against a [`Value`] - usually a `Map` - and every
//! compiled expression evaluates to a [`Value`]. The engine treats state as
//! immutable data: extension points ([`Value::extended`], [`Value::without`])
//! always return a new map and never touch the caller's.
//!
//! # Identity vs equality
//!
//! Values carry two notions of sameness. [`Value::same_identity`] compares
//! scalars by value and lists, maps and templates by allocation
//! ([`Rc::ptr_eq`]); structural comparison is what `PartialEq` (and the
//! expression `==` operator) gives you. A freshly allocated map that
//! happens to hold the same fields is equal but not the same identity.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::render::Template;

/// A dynamic value flowing through renders and updates.
#[derive(Clone, Debug)]
pub enum Value {
    /// Absent - the result of any unresolvable or failed evaluation.
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Double-precision number.
    Number(f64),
    /// Immutable string.
    String(Rc<str>),
    /// Ordered list.
    List(Rc<Vec<Value>>),
    /// String-keyed map.
    Map(Rc<HashMap<String, Value>>),
    /// A compiled template carried through state (yield targets,
    /// dynamic `view` references).
    Template(Template),
}

impl Value {
    /// Build a string value.
    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::String(s.into())
    }

    /// Build a list value.
    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(items))
    }

    /// Build a map value from key/value pairs.
    pub fn map(entries: impl IntoIterator<Item = (String, Value)>) -> Value {
        Value::Map(Rc::new(entries.into_iter().collect()))
    }

    /// Convert a `serde_json::Value` into an engine value.
    ///
    /// JSON `null` maps to [`Value::Null`]; there is no JSON spelling for
    /// `Undefined`.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => {
                Value::List(Rc::new(items.into_iter().map(Value::from_json).collect()))
            }
            serde_json::Value::Object(fields) => Value::Map(Rc::new(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from_json(v)))
                    .collect(),
            )),
        }
    }

    /// True unless the value is `Undefined`, `Null`, `false`, `0`, `NaN`
    /// or the empty string. Lists and maps are always truthy, empty or not.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Template(_) => true,
        }
    }

    /// True for [`Value::Undefined`].
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Identity comparison: value comparison for scalars, allocation
    /// identity for lists, maps and templates.
    pub fn same_identity(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Template(a), Value::Template(b)) => a.same(b),
            (Value::List(_) | Value::Map(_) | Value::Template(_), _) => false,
            (_, Value::List(_) | Value::Map(_) | Value::Template(_)) => false,
            (a, b) => a == b,
        }
    }

    /// Look up a field on a map. `None` when the value is not a map or the
    /// field is absent - callers that want the degrade-to-undefined policy
    /// use [`Value::field`].
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match self {
            Value::Map(fields) => fields.get(name).cloned(),
            _ => None,
        }
    }

    /// Field access that degrades to `Undefined`.
    pub fn field(&self, name: &str) -> Value {
        self.lookup(name).unwrap_or(Value::Undefined)
    }

    /// List index access that degrades to `Undefined`.
    pub fn index(&self, idx: usize) -> Value {
        match self {
            Value::List(items) => items.get(idx).cloned().unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        }
    }

    /// Shallow-copy this map and add the given entries. Non-map values
    /// extend from an empty map. The receiver is never mutated.
    pub fn extended(&self, entries: impl IntoIterator<Item = (String, Value)>) -> Value {
        let mut fields: HashMap<String, Value> = match self {
            Value::Map(existing) => (**existing).clone(),
            _ => HashMap::new(),
        };
        for (key, value) in entries {
            fields.insert(key, value);
        }
        Value::Map(Rc::new(fields))
    }

    /// Shallow-copy this map without one key.
    pub fn without(&self, key: &str) -> Value {
        match self {
            Value::Map(existing) => {
                let mut fields = (**existing).clone();
                fields.remove(key);
                Value::Map(Rc::new(fields))
            }
            other => other.clone(),
        }
    }

    /// Numeric view for arithmetic. Strings parse, booleans coerce,
    /// everything else is not a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// The string this value renders as in text nodes and attributes.
    ///
    /// `Undefined` and `Null` render empty rather than leaking a
    /// placeholder word into the document.
    pub fn display_string(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::List(items) => items
                .iter()
                .map(Value::display_string)
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) => "[object]".to_string(),
            Value::Template(_) => "[template]".to_string(),
        }
    }
}

/// Integer-valued floats print without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Template(a), Value::Template(b)) => a.same(b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s.into())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Value {
        Value::from_json(json)
    }
}
