use super::types::{HandlerDescriptor, HandlerKind, ParamBinding, ParamSource, ParamType};
use anyhow::{anyhow, Context};
use http::Method;
use serde::Deserialize;
use std::path::Path;

/// Supplies the full descriptor list at startup.
///
/// The dispatcher is agnostic to how routes are declared; it only consumes
/// the resulting descriptors.
pub trait ConventionProvider {
    fn descriptors(&self) -> anyhow::Result<Vec<HandlerDescriptor>>;
}

/// Explicit registration: the descriptors are the convention.
impl ConventionProvider for Vec<HandlerDescriptor> {
    fn descriptors(&self) -> anyhow::Result<Vec<HandlerDescriptor>> {
        Ok(self.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SourceEntry {
    Path,
    Query,
    Header,
    Body,
}

impl From<SourceEntry> for ParamSource {
    fn from(s: SourceEntry) -> Self {
        match s {
            SourceEntry::Path => ParamSource::Path,
            SourceEntry::Query => ParamSource::Query,
            SourceEntry::Header => ParamSource::Header,
            SourceEntry::Body => ParamSource::Body,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TypeEntry {
    String,
    Integer,
    Number,
    Boolean,
    #[serde(alias = "object", alias = "array")]
    Json,
}

impl From<TypeEntry> for ParamType {
    fn from(t: TypeEntry) -> Self {
        match t {
            TypeEntry::String => ParamType::String,
            TypeEntry::Integer => ParamType::Integer,
            TypeEntry::Number => ParamType::Number,
            TypeEntry::Boolean => ParamType::Boolean,
            TypeEntry::Json => ParamType::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KindEntry {
    #[default]
    Blocking,
    Deferred,
}

#[derive(Debug, Clone, Deserialize)]
struct ParamEntry {
    name: String,
    #[serde(rename = "in")]
    source: SourceEntry,
    #[serde(rename = "type", default = "default_type")]
    ty: TypeEntry,
    /// Path and body parameters default to required, others to optional
    required: Option<bool>,
}

fn default_type() -> TypeEntry {
    TypeEntry::String
}

#[derive(Debug, Clone, Deserialize)]
struct RouteEntry {
    method: String,
    path: String,
    service: String,
    operation: String,
    #[serde(default)]
    kind: KindEntry,
    #[serde(default)]
    params: Vec<ParamEntry>,
    #[serde(default)]
    produces: Vec<String>,
    #[serde(default)]
    consumes: Vec<String>,
}

/// Declarative route table read from YAML or JSON.
///
/// ```yaml
/// routes:
///   - method: GET
///     path: /items/{id}
///     service: ItemService
///     operation: get_item
///     kind: blocking
///     produces: [text/plain]
///     params:
///       - { name: id, in: path, type: integer }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
}

impl RouteTable {
    /// Parse a YAML document (JSON is valid YAML).
    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse route table")
    }

    /// Parse a JSON document.
    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        serde_json::from_str(content).context("Failed to parse route table")
    }

    /// Number of routes declared.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl ConventionProvider for RouteTable {
    fn descriptors(&self) -> anyhow::Result<Vec<HandlerDescriptor>> {
        self.routes.iter().map(build_descriptor).collect()
    }
}

fn build_descriptor(entry: &RouteEntry) -> anyhow::Result<HandlerDescriptor> {
    let method = Method::from_bytes(entry.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| anyhow!("Invalid HTTP method '{}' for {}", entry.method, entry.path))?;

    let mut builder =
        HandlerDescriptor::builder(method, &entry.path, &entry.service, &entry.operation).kind(
            match entry.kind {
                KindEntry::Blocking => HandlerKind::Blocking,
                KindEntry::Deferred => HandlerKind::Deferred,
            },
        );

    for p in &entry.params {
        let source = ParamSource::from(p.source);
        let required = p
            .required
            .unwrap_or(matches!(source, ParamSource::Path | ParamSource::Body));
        builder = builder.param(ParamBinding::new(&p.name, source, p.ty.into(), required));
    }
    for mime in &entry.produces {
        builder = builder.produces(mime);
    }
    for mime in &entry.consumes {
        builder = builder.consumes(mime);
    }

    builder
        .build()
        .with_context(|| format!("Invalid route {} {}", entry.method, entry.path))
}

/// Load a route table from a `.yaml`/`.yml` or `.json` file.
pub fn load_route_table(file_path: impl AsRef<Path>) -> anyhow::Result<RouteTable> {
    let file_path = file_path.as_ref();
    let content = std::fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read route table {}", file_path.display()))?;
    match file_path.extension().and_then(|e| e.to_str()) {
        Some("json") => RouteTable::from_json_str(&content),
        _ => RouteTable::from_yaml_str(&content),
    }
}
