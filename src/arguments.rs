//! Positional argument sequences.
//!
//! [`RawArguments`] are extracted per request by the route resolver, one
//! entry per declared parameter. [`TypedArguments`] are what the negotiated
//! serializer produced from them and what a handler receives. Both are
//! positional and must have exactly `descriptor.parameters.len()` entries.

use crate::error::HandlerError;
use crate::router::MAX_INLINE_PARAMS;
use serde::de::DeserializeOwned;
use serde_json::Value;
use smallvec::SmallVec;

/// Raw tokens in parameter order.
///
/// `None` marks an optional parameter whose source carried no value.
pub type RawArguments = SmallVec<[Option<String>; MAX_INLINE_PARAMS]>;

/// Converted values in parameter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedArguments {
    values: SmallVec<[Value; MAX_INLINE_PARAMS]>,
}

impl TypedArguments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw JSON value at `index`.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Deserialize the argument at `index` into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Failed`] if the index is out of range or the value
    /// does not deserialize into `T`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, HandlerError> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| HandlerError::failed(format!("missing argument #{}", index)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| HandlerError::failed(format!("argument #{}: {}", index, e)))
    }

    /// Borrow a string argument.
    #[must_use]
    pub fn str(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(Value::as_str)
    }

    #[must_use]
    pub fn i64(&self, index: usize) -> Option<i64> {
        self.values.get(index).and_then(Value::as_i64)
    }

    #[must_use]
    pub fn f64(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(Value::as_f64)
    }

    #[must_use]
    pub fn bool(&self, index: usize) -> Option<bool> {
        self.values.get(index).and_then(Value::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        self.values.into_vec()
    }
}

impl FromIterator<Value> for TypedArguments {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        name: String,
    }

    #[test]
    fn test_typed_accessors() {
        let args: TypedArguments = vec![json!(42), json!("abc"), json!({"name": "x"}), Value::Null]
            .into_iter()
            .collect();
        assert_eq!(args.len(), 4);
        assert_eq!(args.i64(0), Some(42));
        assert_eq!(args.str(1), Some("abc"));
        assert_eq!(args.get::<Item>(2).expect("item"), Item { name: "x".into() });
        assert_eq!(args.get::<Option<i64>>(3).expect("null"), None);
        assert!(args.get::<i64>(9).is_err());
        assert!(args.get::<i64>(1).is_err());
    }
}
