//! Type-erased values, stored and retrieved by variable name.
//!
//! `Value` is a closed tagged sum (per spec, "prefer a tagged sum over raw
//! pointer casts") rather than an `Any`-erased box: every built-in variable
//! type produces one of these four shapes, so a wrong-type retrieval is a
//! caller error (`Error::Internal`) rather than a silent cast.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// A concrete value produced by a `Variable`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value"))]
pub enum Value {
    Int(i64),
    Str(String),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(Error::internal(format!(
                "expected an integer value, found a {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(v) => Ok(v.as_str()),
            other => Err(Error::internal(format!(
                "expected a string value, found a {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(v) => Ok(v.as_slice()),
            other => Err(Error::internal(format!(
                "expected an array value, found a {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_tuple(&self) -> Result<&[Value]> {
        match self {
            Value::Tuple(v) => Ok(v.as_slice()),
            other => Err(Error::internal(format!(
                "expected a tuple value, found a {}",
                other.type_name()
            ))),
        }
    }

    /// An approximate size used against `GenerationConfig`'s soft budget:
    /// integers count as 1, strings by their length, and containers by the
    /// sum of their elements' approximate sizes.
    pub fn approximate_size(&self) -> i64 {
        match self {
            Value::Int(_) => 1,
            Value::Str(s) => s.len() as i64,
            Value::Array(items) | Value::Tuple(items) => {
                items.iter().map(Value::approximate_size).sum()
            }
        }
    }
}

/// A named map of assigned values.
///
/// Type-checked accessors (`get_int`, `get_str`, ...) exist alongside the
/// untyped `get`/`set` pair because most call sites know the expected shape
/// and want the type error folded into the ordinary `Result` flow rather
/// than an extra `as_int()` at every call site.
#[derive(Debug, Clone, Default)]
pub struct ValueSet {
    values: HashMap<String, Value>,
}

impl ValueSet {
    pub fn new() -> Self {
        ValueSet { values: HashMap::new() }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_int(&self, name: &str) -> Result<Option<i64>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(v) => v.as_int().map(Some),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Removes the value, if present. Idempotent: erasing an absent name
    /// succeeds as a no-op.
    pub fn erase(&mut self, name: &str) {
        self.values.remove(name);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The sum of `Value::approximate_size` across every stored value.
    pub fn approximate_total_size(&self) -> i64 {
        self.values.values().map(Value::approximate_size).sum()
    }

    /// Builds the `name -> i64` environment `Expression`/`Range` evaluation
    /// needs, skipping non-integer values (a dependency expression that
    /// references a non-integer variable will surface its own error when
    /// evaluated against an environment missing that name).
    pub fn integer_environment(&self) -> HashMap<String, i64> {
        self.values
            .iter()
            .filter_map(|(name, value)| match value {
                Value::Int(v) => Some((name.clone(), *v)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_checked_accessors_reject_mismatches() {
        let v = Value::Str("hi".into());
        assert!(v.as_int().is_err());
        assert_eq!(v.as_str().unwrap(), "hi");
    }

    #[test]
    fn approximate_size_matches_spec_examples() {
        assert_eq!(Value::Int(42).approximate_size(), 1);
        assert_eq!(Value::Str("abcde".into()).approximate_size(), 5);
        let arr = Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(arr.approximate_size(), 3);
    }

    #[test]
    fn value_set_erase_is_idempotent() {
        let mut vs = ValueSet::new();
        vs.erase("missing");
        vs.set("x", Value::Int(1));
        vs.erase("x");
        vs.erase("x");
        assert!(!vs.contains("x"));
    }

    #[test]
    fn value_set_contains_and_get() {
        let mut vs = ValueSet::new();
        vs.set("n", Value::Int(7));
        assert!(vs.contains("n"));
        assert_eq!(vs.get_int("n").unwrap(), Some(7));
        assert_eq!(vs.get_int("missing").unwrap(), None);
    }

    #[test]
    fn integer_environment_skips_non_integers() {
        let mut vs = ValueSet::new();
        vs.set("n", Value::Int(5));
        vs.set("s", Value::Str("x".into()));
        let env = vs.integer_environment();
        assert_eq!(env.get("n"), Some(&5));
        assert!(!env.contains_key("s"));
    }
}
