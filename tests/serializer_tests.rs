use brrtdispatch::descriptor::ParamType;
use brrtdispatch::error::SerializerError;
use brrtdispatch::serializer::{
    JsonSerializer, PlainTextSerializer, Serializer, SerializerRegistry, YamlSerializer,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn registry() -> SerializerRegistry {
    SerializerRegistry::builder()
        .register("application/json", JsonSerializer)
        .register("text/plain", PlainTextSerializer)
        .register("application/yaml", YamlSerializer)
        .build()
}

fn type_of(value: &Value) -> ParamType {
    match value {
        Value::String(_) => ParamType::String,
        Value::Bool(_) => ParamType::Boolean,
        Value::Number(n) if n.is_f64() => ParamType::Number,
        Value::Number(_) => ParamType::Integer,
        _ => ParamType::Json,
    }
}

#[test]
fn test_encoded_values_decode_to_themselves() {
    let scalars = [
        json!("hello world"),
        json!("42"),
        json!(""),
        json!(-7),
        json!(2.5),
        json!(true),
    ];
    let documents = [json!({"name": "widget", "tags": ["a", "b"], "qty": 3}), json!([1, 2])];

    let registry = registry();
    for mime in registry.mime_types() {
        let s = registry.get(mime).expect("serializer");
        let structured = mime != "text/plain";
        let values = scalars
            .iter()
            .chain(documents.iter().filter(|_| structured));
        for v in values {
            let encoded = s.encode(v).expect("encode");
            let decoded = s.decode(&encoded, type_of(v)).expect("decode");
            assert_eq!(&decoded, v, "{} round trip of {}", mime, v);
        }
    }
}

#[test]
fn test_lookup_is_case_insensitive() {
    let registry = registry();
    assert!(registry.contains("APPLICATION/JSON"));
    assert!(registry.contains(" text/plain "));
    assert!(!registry.contains("application/xml"));
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_custom_serializer_plugs_in() {
    struct Upper;
    impl Serializer for Upper {
        fn decode(&self, raw: &str, _target: ParamType) -> Result<Value, SerializerError> {
            Ok(Value::String(raw.to_lowercase()))
        }
        fn encode(&self, value: &Value) -> Result<String, SerializerError> {
            value
                .as_str()
                .map(str::to_uppercase)
                .ok_or_else(|| SerializerError::Encode("strings only".into()))
        }
    }

    let shared: Arc<dyn Serializer> = Arc::new(Upper);
    let registry = SerializerRegistry::builder()
        .register_arc("text/x-shout", Arc::clone(&shared))
        .build();
    let s = registry.get("text/x-shout").expect("serializer");
    assert_eq!(s.encode(&json!("hey")).expect("encode"), "HEY");
    assert_eq!(s.decode("HEY", ParamType::String).expect("decode"), json!("hey"));
    assert!(s.encode(&json!(1)).is_err());
}

#[test]
fn test_decode_errors_carry_the_input() {
    let err = JsonSerializer
        .decode("twelve", ParamType::Integer)
        .unwrap_err();
    assert!(matches!(err, SerializerError::Decode(_)));
    assert!(err.message().contains("twelve"));
}
