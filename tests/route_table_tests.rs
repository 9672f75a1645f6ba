use brrtdispatch::descriptor::{load_route_table, ConventionProvider, HandlerKind, ParamSource};
use brrtdispatch::router::{RouteResolver, Router};
use brrtdispatch::RuntimeConfig;
use http::Method;
use std::io::Write;

const YAML_TABLE: &str = r#"
routes:
  - method: GET
    path: /pets/{id}
    service: PetService
    operation: get_pet
    produces: [application/json]
    params:
      - { name: id, in: path, type: integer }
      - { name: verbose, in: query, type: boolean }
      - { name: x-trace, in: header, required: true }
  - method: POST
    path: /pets
    service: PetService
    operation: add_pet
    kind: deferred
    consumes: [application/json]
    params:
      - { name: pet, in: body, type: object }
"#;

fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("temp file");
    file.write_all(content.as_bytes()).expect("write");
    file
}

#[test]
fn test_load_yaml_table() {
    let file = write_temp(YAML_TABLE, ".yaml");
    let table = load_route_table(file.path()).expect("load");
    assert_eq!(table.len(), 2);

    let descriptors = table.descriptors().expect("descriptors");
    let get_pet = &descriptors[0];
    assert_eq!(get_pet.qualified_name(), "PetService::get_pet");
    assert_eq!(get_pet.produces, vec!["application/json"]);
    assert_eq!(get_pet.parameters.len(), 3);
    assert_eq!(get_pet.parameters[2].source, ParamSource::Header);
    assert!(get_pet.parameters[2].required);
    assert!(!get_pet.parameters[1].required);

    let add_pet = &descriptors[1];
    assert_eq!(add_pet.kind, HandlerKind::Deferred);
    assert!(add_pet.accepts_request_type("application/json"));
    assert!(!add_pet.accepts_request_type("text/plain"));
}

#[test]
fn test_load_json_table() {
    let json = r#"{"routes":[{"method":"delete","path":"/pets/{id}","service":"PetService",
        "operation":"remove_pet","params":[{"name":"id","in":"path","type":"integer"}]}]}"#;
    let file = write_temp(json, ".json");
    let config = RuntimeConfig::default()
        .with_overrides(|k| (k == "BRRTD_DEFAULT_MIME").then(|| "text/plain".to_string()));
    let router = Router::from_convention(&load_route_table(file.path()).expect("load"), &config)
        .expect("router");

    let d = router
        .resolve(&Method::DELETE, "/pets/3")
        .expect("resolve")
        .expect("match");
    assert_eq!(&*d.operation, "remove_pet");
    assert_eq!(router.default_mime_type(), "text/plain");
}

#[test]
fn test_duplicate_routes_fail_router_construction() {
    let yaml = r#"
routes:
  - { method: GET, path: "/pets/{id}", service: A, operation: one, params: [{ name: id, in: path }] }
  - { method: GET, path: "/pets/{pet_id}", service: B, operation: two, params: [{ name: pet_id, in: path }] }
"#;
    let file = write_temp(yaml, ".yml");
    let table = load_route_table(file.path()).expect("load");
    let err = Router::from_convention(&table, &RuntimeConfig::default()).unwrap_err();
    assert!(format!("{err:#}").contains("Duplicate route"));
}

#[test]
fn test_invalid_method_is_reported() {
    let yaml = "routes:\n  - { method: \"GE T\", path: /x, service: S, operation: op }\n";
    let file = write_temp(yaml, ".yaml");
    let err = load_route_table(file.path())
        .expect("load")
        .descriptors()
        .unwrap_err();
    assert!(err.to_string().contains("Invalid HTTP method"));
}

#[test]
fn test_missing_file() {
    let err = load_route_table("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read route table"));
}

#[test]
fn test_unknown_parameter_source_rejected() {
    let yaml = "routes:\n  - { method: GET, path: /x, service: S, operation: op, params: [{ name: c, in: cookie }] }\n";
    assert!(brrtdispatch::descriptor::RouteTable::from_yaml_str(yaml).is_err());
}
