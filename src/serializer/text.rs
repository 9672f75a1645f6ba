use super::Serializer;
use crate::descriptor::ParamType;
use crate::error::SerializerError;
use serde_json::{Number, Value};

/// `text/plain` plug-in: scalars in their textual form.
///
/// Only strings, numbers, booleans and null can be encoded; arrays and
/// objects have no plain-text representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextSerializer;

impl Serializer for PlainTextSerializer {
    fn decode(&self, raw: &str, target: ParamType) -> Result<Value, SerializerError> {
        let bad = || SerializerError::Decode(format!("'{}' is not a valid {}", raw, target));
        let trimmed = raw.trim();
        match target {
            ParamType::String => Ok(Value::String(raw.to_string())),
            ParamType::Integer => trimmed
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| trimmed.parse::<u64>().map(Value::from))
                .map_err(|_| bad()),
            ParamType::Number => trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(bad),
            ParamType::Boolean => trimmed.parse::<bool>().map(Value::from).map_err(|_| bad()),
            ParamType::Json => serde_json::from_str(trimmed)
                .map_err(|e| SerializerError::Decode(format!("'{}': {}", raw, e))),
        }
    }

    fn encode(&self, value: &Value) -> Result<String, SerializerError> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok(String::new()),
            Value::Array(_) | Value::Object(_) => Err(SerializerError::Encode(
                "structured values have no text/plain representation".to_string(),
            )),
        }
    }
}
