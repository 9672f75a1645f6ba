use super::json::check_shape;
use super::Serializer;
use crate::descriptor::ParamType;
use crate::error::SerializerError;
use serde_json::Value;

/// `application/yaml` plug-in backed by `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlSerializer;

impl Serializer for YamlSerializer {
    fn decode(&self, raw: &str, target: ParamType) -> Result<Value, SerializerError> {
        let parsed = serde_yaml::from_str::<Value>(raw);
        if target == ParamType::String {
            return Ok(match parsed {
                Ok(Value::String(s)) => Value::String(s),
                _ => Value::String(raw.to_string()),
            });
        }
        let value = parsed
            .map_err(|e| SerializerError::Decode(format!("'{}' is not valid YAML: {}", raw, e)))?;
        check_shape(value, target, raw)
    }

    fn encode(&self, value: &Value) -> Result<String, SerializerError> {
        serde_yaml::to_string(value).map_err(|e| SerializerError::Encode(e.to_string()))
    }
}
