use super::Serializer;
use crate::descriptor::ParamType;
use crate::error::SerializerError;
use serde_json::Value;

/// `application/json` plug-in.
///
/// String parameters accept either a JSON string literal (`"abc"`) or the
/// bare token (`abc`), since path and query values are rarely quoted.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn decode(&self, raw: &str, target: ParamType) -> Result<Value, SerializerError> {
        if target == ParamType::String {
            return Ok(match serde_json::from_str::<Value>(raw) {
                Ok(Value::String(s)) => Value::String(s),
                _ => Value::String(raw.to_string()),
            });
        }

        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|e| SerializerError::Decode(format!("'{}' is not valid JSON: {}", raw, e)))?;
        check_shape(value, target, raw)
    }

    fn encode(&self, value: &Value) -> Result<String, SerializerError> {
        serde_json::to_string(value).map_err(|e| SerializerError::Encode(e.to_string()))
    }
}

/// Reject values whose JSON shape does not fit the declared type.
pub(super) fn check_shape(
    value: Value,
    target: ParamType,
    raw: &str,
) -> Result<Value, SerializerError> {
    let fits = match target {
        ParamType::String => value.is_string(),
        ParamType::Integer => value.is_i64() || value.is_u64(),
        ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::Json => true,
    };
    if fits {
        Ok(value)
    } else {
        Err(SerializerError::Decode(format!(
            "'{}' is not a valid {}",
            raw, target
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_by_type_tag() {
        let s = JsonSerializer;
        assert_eq!(s.decode("42", ParamType::Integer).expect("int"), json!(42));
        assert_eq!(s.decode("4.5", ParamType::Number).expect("num"), json!(4.5));
        assert_eq!(s.decode("true", ParamType::Boolean).expect("bool"), json!(true));
        assert_eq!(s.decode("abc", ParamType::String).expect("str"), json!("abc"));
        assert_eq!(s.decode("\"abc\"", ParamType::String).expect("str"), json!("abc"));
        assert_eq!(s.decode("42", ParamType::String).expect("str"), json!("42"));
        assert_eq!(
            s.decode(r#"{"name":"x"}"#, ParamType::Json).expect("obj"),
            json!({"name": "x"})
        );
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let s = JsonSerializer;
        assert!(s.decode("4.5", ParamType::Integer).is_err());
        assert!(s.decode("abc", ParamType::Integer).is_err());
        assert!(s.decode("1", ParamType::Boolean).is_err());
        assert!(s.decode("{", ParamType::Json).is_err());
    }

    #[test]
    fn test_encode_compact() {
        let s = JsonSerializer;
        assert_eq!(
            s.encode(&json!({"id": 1, "tags": ["a"]})).expect("encode"),
            r#"{"id":1,"tags":["a"]}"#
        );
        assert_eq!(s.encode(&json!("x")).expect("encode"), "\"x\"");
    }
}
